//! Error types for the server-room monitor
//!
//! Source failures are split into transport problems (network, timeout, HTTP
//! status) and format problems (the response envelope did not match). Both are
//! non-fatal at the poll-cycle boundary; the helpers here decide how they are
//! logged and which connectivity status they map to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Error types for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Network failure reaching the data source
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected envelope grammar
    #[error("Format error: {0}")]
    Format(String),

    /// Fetch exceeded its bounded timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client could not be set up
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionLost,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Data errors (1400-1499)
    InvalidInput,
    MessageMalformed,

    // Service errors (1600-1699)
    ExternalServiceError,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionLost => 1003,
            ErrorCode::ConfigurationInvalid => 1202,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::MessageMalformed => 1403,
            ErrorCode::ExternalServiceError => 1603,
            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1200..=1299 => "configuration",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Low severity - information only
    Info,
    /// Medium severity - warning condition
    Warning,
    /// High severity - error condition
    Error,
}

impl MonitorError {
    /// Create a transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Self::Format(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Convert to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            MonitorError::Transport(_) => ErrorCode::ConnectionLost,
            MonitorError::Format(_) => ErrorCode::MessageMalformed,
            MonitorError::Timeout(_) => ErrorCode::ConnectionTimeout,
            MonitorError::Config(_) => ErrorCode::ConfigurationInvalid,
            MonitorError::InvalidInput(_) => ErrorCode::InvalidInput,
            MonitorError::Http(_) => ErrorCode::ExternalServiceError,
            MonitorError::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MonitorError::Transport(_) | MonitorError::Timeout(_) | MonitorError::Format(_) => {
                ErrorSeverity::Warning
            }
            MonitorError::InvalidInput(_) => ErrorSeverity::Info,
            MonitorError::Config(_) | MonitorError::Http(_) | MonitorError::Io(_) => {
                ErrorSeverity::Error
            }
        }
    }

    /// Check if the next poll interval may succeed without intervention
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::Transport(_) | MonitorError::Timeout(_) | MonitorError::Format(_)
        )
    }

    /// True for failures reaching the source (as opposed to understanding it)
    pub fn is_transport(&self) -> bool {
        matches!(self, MonitorError::Transport(_) | MonitorError::Timeout(_))
    }

    /// Get a production-safe error message
    pub fn sanitized_message(&self) -> String {
        #[cfg(debug_assertions)]
        {
            self.to_string()
        }
        #[cfg(not(debug_assertions))]
        {
            match self {
                MonitorError::Transport(_) => "Data source unreachable".to_string(),
                MonitorError::Format(_) => "Unexpected response from data source".to_string(),
                MonitorError::Timeout(_) => "Operation timed out".to_string(),
                MonitorError::Config(_) => "Configuration error".to_string(),
                MonitorError::InvalidInput(_) => "Invalid input provided".to_string(),
                MonitorError::Http(_) => "HTTP client unavailable".to_string(),
                MonitorError::Io(_) => "I/O operation failed".to_string(),
            }
        }
    }
}

/// Error logging utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error with a level derived from its severity
    pub fn log_error(error: &MonitorError, component: &str, operation: &str) {
        let code = error.to_error_code();
        let message = error.sanitized_message();

        match error.severity() {
            ErrorSeverity::Error => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    retryable = error.is_retryable(),
                    "Error occurred: {}",
                    message
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    retryable = error.is_retryable(),
                    "Warning: {}",
                    message
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "Info: {}",
                    message
                );
            }
        }
    }
}
