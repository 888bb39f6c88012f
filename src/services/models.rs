//! Typed records produced from raw table rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One telemetry sample from the server-room controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    pub fan1_on: bool,
    pub fan2_on: bool,
    /// NORMAL or ALARM as written by the device
    pub alarm_state: String,
    /// LOCKED or UNLOCKED as written by the device
    pub door_state: String,
    /// Signal strength in dBm; 0 means no reading
    pub wifi_rssi: f64,
    /// `None` until the device has synced its thresholds
    pub warn_threshold: Option<f64>,
    pub stage2_threshold: Option<f64>,
}

/// Outcome recorded by the door terminal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessResult {
    Granted,
    Denied,
    Lockout,
    /// Anything else the terminal wrote, including an empty cell
    Other(String),
}

impl AccessResult {
    pub fn as_str(&self) -> &str {
        match self {
            AccessResult::Granted => "GRANTED",
            AccessResult::Denied => "DENIED",
            AccessResult::Lockout => "LOCKOUT",
            AccessResult::Other(raw) => raw,
        }
    }
}

impl From<String> for AccessResult {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "GRANTED" => AccessResult::Granted,
            "DENIED" => AccessResult::Denied,
            "LOCKOUT" => AccessResult::Lockout,
            _ => AccessResult::Other(raw),
        }
    }
}

impl From<AccessResult> for String {
    fn from(result: AccessResult) -> Self {
        result.as_str().to_string()
    }
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One door terminal event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub user_id: String,
    pub display_name: String,
    pub result: AccessResult,
    pub reason: String,
    pub failed_count: u32,
    /// Device-local value, kept opaque
    pub lockout_until: String,
    pub door_state: String,
}

/// Records produced by one poll; replaced wholesale by the next
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    /// Ascending by timestamp as received
    pub telemetry: Vec<Telemetry>,
    /// Ascending by timestamp as received
    pub access: Vec<AccessEvent>,
}
