//! Snapshot, trend and 24-hour access tallies for one record batch

use crate::services::models::{AccessEvent, AccessResult, Telemetry};
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Look-back window for access tallies
pub const ACCESS_TALLY_WINDOW_MS: i64 = 86_400_000;

/// Maximum number of samples in the trend series
pub const TREND_LENGTH: usize = 60;

/// Placeholder rendered for unknown values
pub const UNKNOWN_LABEL: &str = "--";

/// Wi-Fi signal quality band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Weak,
    /// No reading; an RSSI of exactly 0 dBm is the device's "no data" marker
    Unknown,
}

impl SignalQuality {
    pub fn from_rssi(rssi: f64) -> Self {
        if rssi == 0.0 {
            SignalQuality::Unknown
        } else if rssi >= -50.0 {
            SignalQuality::Excellent
        } else if rssi >= -60.0 {
            SignalQuality::Good
        } else if rssi >= -70.0 {
            SignalQuality::Fair
        } else {
            SignalQuality::Weak
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalQuality::Excellent => "Excellent",
            SignalQuality::Good => "Good",
            SignalQuality::Fair => "Fair",
            SignalQuality::Weak => "Weak",
            SignalQuality::Unknown => UNKNOWN_LABEL,
        };
        f.write_str(label)
    }
}

/// Access outcomes over the last 24 hours
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTally {
    pub granted: usize,
    pub denied: usize,
    pub lockout: usize,
}

/// One point of the temperature/humidity trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Local "HH:MM"
    pub label: String,
    pub temperature: f64,
    pub humidity: f64,
}

/// Current device state, taken from the latest telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub fan1_on: bool,
    pub fan2_on: bool,
    pub alarm_state: String,
    pub door_state: String,
    /// `None` when the device reported no signal data
    pub wifi_rssi: Option<f64>,
    pub signal: SignalQuality,
    pub warn_threshold: Option<f64>,
    pub stage2_threshold: Option<f64>,
}

/// Operational picture derived from one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// `None` for the unknown summary (no telemetry)
    pub snapshot: Option<Snapshot>,
    pub access_24h: AccessTally,
    pub trend: Vec<TrendPoint>,
}

impl Summary {
    /// Summary with no values
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.snapshot.is_none()
    }

    /// Temperature with one decimal, e.g. "28.5"
    pub fn temperature_label(&self) -> String {
        self.snapshot
            .as_ref()
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |s| format!("{:.1}", s.temperature))
    }

    /// Humidity with one decimal
    pub fn humidity_label(&self) -> String {
        self.snapshot
            .as_ref()
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |s| format!("{:.1}", s.humidity))
    }

    /// "F1 ON | F2 OFF"
    pub fn fan_label(&self) -> String {
        match &self.snapshot {
            Some(s) => format!("F1 {} | F2 {}", on_off(s.fan1_on), on_off(s.fan2_on)),
            None => UNKNOWN_LABEL.to_string(),
        }
    }

    /// "-55 dBm (Good)" or the unknown placeholder
    pub fn signal_label(&self) -> String {
        match self.snapshot.as_ref().and_then(|s| s.wifi_rssi.map(|r| (r, s.signal))) {
            Some((rssi, signal)) => format!("{rssi:.0} dBm ({signal})"),
            None => UNKNOWN_LABEL.to_string(),
        }
    }
}

pub fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// Derives the summary from a record batch
#[derive(Debug, Clone)]
pub struct Aggregator {
    /// Offset used to render local time labels
    display_offset: FixedOffset,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl Aggregator {
    pub fn new(display_offset: FixedOffset) -> Self {
        Self { display_offset }
    }

    /// Summarize a batch; `telemetry` must be ascending by timestamp
    pub fn summarize(
        &self,
        telemetry: &[Telemetry],
        access: &[AccessEvent],
        now: DateTime<Utc>,
    ) -> Summary {
        let Some(latest) = telemetry.last() else {
            return Summary::unknown();
        };

        Summary {
            snapshot: Some(Self::snapshot(latest)),
            access_24h: Self::tally(access, now),
            trend: self.trend(telemetry),
        }
    }

    fn snapshot(latest: &Telemetry) -> Snapshot {
        let signal = SignalQuality::from_rssi(latest.wifi_rssi);
        Snapshot {
            timestamp: latest.timestamp,
            device_id: latest.device_id.clone(),
            temperature: latest.temperature,
            humidity: latest.humidity,
            fan1_on: latest.fan1_on,
            fan2_on: latest.fan2_on,
            alarm_state: latest.alarm_state.clone(),
            door_state: latest.door_state.clone(),
            wifi_rssi: (signal != SignalQuality::Unknown).then_some(latest.wifi_rssi),
            signal,
            warn_threshold: latest.warn_threshold,
            stage2_threshold: latest.stage2_threshold,
        }
    }

    /// Count outcomes with `timestamp >= now - 24h`
    pub fn tally(access: &[AccessEvent], now: DateTime<Utc>) -> AccessTally {
        let cutoff = now - Duration::milliseconds(ACCESS_TALLY_WINDOW_MS);

        access
            .iter()
            .filter(|event| event.timestamp >= cutoff)
            .fold(AccessTally::default(), |mut tally, event| {
                match event.result {
                    AccessResult::Granted => tally.granted += 1,
                    AccessResult::Denied => tally.denied += 1,
                    AccessResult::Lockout => tally.lockout += 1,
                    AccessResult::Other(_) => {}
                }
                tally
            })
    }

    /// Last [`TREND_LENGTH`] samples in original order
    pub fn trend(&self, telemetry: &[Telemetry]) -> Vec<TrendPoint> {
        let start = telemetry.len().saturating_sub(TREND_LENGTH);
        telemetry[start..]
            .iter()
            .map(|t| TrendPoint {
                label: t
                    .timestamp
                    .with_timezone(&self.display_offset)
                    .format("%H:%M")
                    .to_string(),
                temperature: t.temperature,
                humidity: t.humidity,
            })
            .collect()
    }
}
