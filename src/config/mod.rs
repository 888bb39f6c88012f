//! Configuration management for the monitor
//!
//! Layering: built-in defaults, then an optional TOML file, then `MONITOR_*`
//! environment variables. The binary applies CLI flags last.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::{env, time::Duration};
use url::Url;

/// Default dataset polled when nothing else is configured
pub const DEFAULT_DATASET_ID: &str = "1OjxwAK8oesknw5RHOvnRcrh6mAZCzVf5kH0vnfPLq4E";

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Data source configuration
    pub source: SourceConfig,

    /// Poll loop configuration
    pub polling: PollingConfig,

    /// Initial presentation settings
    pub dashboard: DashboardConfig,
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Spreadsheet service base URL
    pub base_url: Url,

    /// Bounded timeout for one table fetch
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,

    /// UTC offset (minutes) of the timestamps written by the device
    pub utc_offset_minutes: i32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fetch_timeout: Duration::from_secs(30),
            utc_offset_minutes: 0,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("https://docs.google.com/").expect("static URL is valid")
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Fixed refresh interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(60_000),
        }
    }
}

/// Initial values for the presentation-owned session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset (spreadsheet) identifier
    pub dataset_id: String,

    /// Deliver non-success alerts
    pub notifications_enabled: bool,

    /// History rows per page
    pub page_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            notifications_enabled: true,
            page_size: 10,
        }
    }
}

impl MonitorConfig {
    /// Load configuration: defaults, optional TOML file, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file; missing sections keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            MonitorError::config(format!("Invalid config file {}: {e}", path.display()))
        })
    }

    /// Override fields from `MONITOR_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dataset_id) = env::var("MONITOR_DATASET_ID") {
            self.dashboard.dataset_id = dataset_id.trim().to_string();
        }

        if let Ok(base_url) = env::var("MONITOR_BASE_URL") {
            self.source.base_url = Url::parse(&base_url).map_err(|e| {
                MonitorError::config(format!("Invalid MONITOR_BASE_URL '{base_url}': {e}"))
            })?;
        }

        if let Some(secs) = parse_env::<u64>("MONITOR_POLL_INTERVAL_SECS")? {
            self.polling.interval = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_env::<u64>("MONITOR_FETCH_TIMEOUT_SECS")? {
            self.source.fetch_timeout = Duration::from_secs(secs);
        }

        if let Ok(flag) = env::var("MONITOR_NOTIFICATIONS") {
            self.dashboard.notifications_enabled = parse_flag(&flag).ok_or_else(|| {
                MonitorError::config(format!("Invalid MONITOR_NOTIFICATIONS value '{flag}'"))
            })?;
        }

        if let Some(page_size) = parse_env::<usize>("MONITOR_PAGE_SIZE")? {
            self.dashboard.page_size = page_size;
        }

        if let Some(offset) = parse_env::<i32>("MONITOR_UTC_OFFSET_MINUTES")? {
            self.source.utc_offset_minutes = offset;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval.is_zero() {
            return Err(MonitorError::config("Poll interval must be greater than zero"));
        }
        if self.source.fetch_timeout.is_zero() {
            return Err(MonitorError::config("Fetch timeout must be greater than zero"));
        }
        if self.dashboard.page_size == 0 {
            return Err(MonitorError::config("Page size must be greater than zero"));
        }
        if !matches!(self.source.base_url.scheme(), "http" | "https") {
            return Err(MonitorError::config(format!(
                "Unsupported base URL scheme '{}'",
                self.source.base_url.scheme()
            )));
        }
        // chrono::FixedOffset accepts strictly less than one day
        if self.source.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(MonitorError::config(format!(
                "UTC offset {} minutes is out of range",
                self.source.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Source time zone as a fixed offset
    pub fn source_offset(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.source.utc_offset_minutes * 60)
            .unwrap_or_else(|| chrono::Offset::fix(&chrono::Utc))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| MonitorError::config(format!("Invalid {key} value '{raw}'"))),
        Err(_) => Ok(None),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
