//! Normalization of raw table rows into typed records
//!
//! Cells map to fields by position. Row-level defects never surface as errors:
//! a row whose timestamp cannot be read is dropped, a numeric reading that does
//! not coerce to a finite number becomes 0 and the row is kept.

use crate::client::{RawPayload, RawRow};
use crate::services::models::{AccessEvent, AccessResult, Telemetry};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Telemetry column positions
mod telemetry_col {
    pub const TIMESTAMP: usize = 0;
    pub const DEVICE_ID: usize = 1;
    pub const TEMPERATURE: usize = 2;
    pub const HUMIDITY: usize = 3;
    pub const FAN1: usize = 4;
    pub const FAN2: usize = 5;
    pub const ALARM_STATE: usize = 6;
    pub const DOOR_STATE: usize = 7;
    pub const WIFI_RSSI: usize = 8;
    pub const WARN_THRESHOLD: usize = 9;
    pub const STAGE2_THRESHOLD: usize = 10;
}

/// Access column positions
mod access_col {
    pub const TIMESTAMP: usize = 0;
    pub const DEVICE_ID: usize = 1;
    pub const USER_ID: usize = 2;
    pub const DISPLAY_NAME: usize = 3;
    pub const RESULT: usize = 4;
    pub const REASON: usize = 5;
    pub const FAILED_COUNT: usize = 6;
    pub const LOCKOUT_UNTIL: usize = 7;
    pub const DOOR_STATE: usize = 8;
}

/// Naive layouts accepted for generic date strings, tried in order
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

fn date_constructor_regex() -> &'static Regex {
    static DATE_CTOR: OnceLock<Regex> = OnceLock::new();
    DATE_CTOR.get_or_init(|| {
        Regex::new(r"^Date\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)$").expect("valid regex")
    })
}

/// Parses telemetry and access payloads into ordered record sequences
#[derive(Debug, Clone)]
pub struct RecordParser {
    /// Offset used for timestamps that carry no zone of their own
    source_offset: FixedOffset,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl RecordParser {
    pub fn new(source_offset: FixedOffset) -> Self {
        Self { source_offset }
    }

    /// Parse the telemetry table, preserving row order
    pub fn parse_telemetry(&self, payload: &RawPayload) -> Vec<Telemetry> {
        let records: Vec<Telemetry> = payload
            .rows
            .iter()
            .filter_map(|row| self.telemetry_row(row))
            .collect();

        debug!(
            "Parsed {} of {} telemetry rows",
            records.len(),
            payload.rows.len()
        );
        records
    }

    /// Parse the access table, preserving row order
    pub fn parse_access(&self, payload: &RawPayload) -> Vec<AccessEvent> {
        let records: Vec<AccessEvent> = payload
            .rows
            .iter()
            .filter_map(|row| self.access_row(row))
            .collect();

        debug!(
            "Parsed {} of {} access rows",
            records.len(),
            payload.rows.len()
        );
        records
    }

    fn telemetry_row(&self, row: &RawRow) -> Option<Telemetry> {
        use telemetry_col::*;

        let timestamp = self.parse_timestamp(row.value(TIMESTAMP))?;

        Some(Telemetry {
            timestamp,
            device_id: text(row.value(DEVICE_ID)),
            temperature: coerce_number(row.value(TEMPERATURE)),
            humidity: coerce_number(row.value(HUMIDITY)),
            fan1_on: flag(row.value(FAN1)),
            fan2_on: flag(row.value(FAN2)),
            alarm_state: text_or(row.value(ALARM_STATE), "NORMAL"),
            door_state: text_or(row.value(DOOR_STATE), "LOCKED"),
            wifi_rssi: coerce_number(row.value(WIFI_RSSI)),
            warn_threshold: coerce_optional(row.value(WARN_THRESHOLD)),
            stage2_threshold: coerce_optional(row.value(STAGE2_THRESHOLD)),
        })
    }

    fn access_row(&self, row: &RawRow) -> Option<AccessEvent> {
        use access_col::*;

        let timestamp = self.parse_timestamp(row.value(TIMESTAMP))?;

        Some(AccessEvent {
            timestamp,
            device_id: text(row.value(DEVICE_ID)),
            user_id: text(row.value(USER_ID)),
            display_name: text(row.value(DISPLAY_NAME)),
            result: AccessResult::from(text(row.value(RESULT))),
            reason: text(row.value(REASON)),
            failed_count: coerce_count(row.value(FAILED_COUNT)),
            lockout_until: text(row.value(LOCKOUT_UNTIL)),
            door_state: text(row.value(DOOR_STATE)),
        })
    }

    /// Read a timestamp cell.
    ///
    /// Accepts epoch milliseconds, `Date(y,m0,d,h,mi,s)` with a zero-based
    /// month, or a generic date string. Zone-less forms use the source offset.
    pub fn parse_timestamp(&self, value: Option<&Value>) -> Option<DateTime<Utc>> {
        match value? {
            Value::Number(n) => {
                let millis = n.as_i64().or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })?;
                DateTime::from_timestamp_millis(millis)
            }
            Value::String(s) => {
                let s = s.trim();
                if s.starts_with("Date(") {
                    if let Some(ts) = self.parse_date_constructor(s) {
                        return Some(ts);
                    }
                }
                self.parse_date_string(s)
            }
            _ => None,
        }
    }

    fn parse_date_constructor(&self, s: &str) -> Option<DateTime<Utc>> {
        let caps = date_constructor_regex().captures(s)?;
        let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

        let year = i32::try_from(part(1)?).ok()?;
        let month = part(2)?.checked_add(1)?;
        let date = NaiveDate::from_ymd_opt(year, month, part(3)?)?;
        let naive = date.and_hms_opt(part(4)?, part(5)?, part(6)?)?;
        self.localize(naive)
    }

    fn parse_date_string(&self, s: &str) -> Option<DateTime<Utc>> {
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return self.localize(naive);
            }
        }

        for format in NAIVE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return self.localize(date.and_hms_opt(0, 0, 0)?);
            }
        }

        None
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.source_offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Numeric coercion; null, empty and unparseable values all end up as 0
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let n = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(_) => f64::NAN,
    };

    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Coercion for optional cells: absent stays absent, never becomes 0
pub fn coerce_optional(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coerce_count(value: Option<&Value>) -> u32 {
    let n = coerce_number(value);
    if n <= 0.0 {
        0
    } else if n >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        n.trunc() as u32
    }
}

/// String rendering of a cell; absent, `false` and numeric zero are all empty
pub fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    let s = text(value);
    if s.is_empty() {
        default.to_string()
    } else {
        s
    }
}

fn flag(value: Option<&Value>) -> bool {
    text(value).eq_ignore_ascii_case("true")
}
