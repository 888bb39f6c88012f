//! Alert evaluation for one poll cycle
//!
//! Stateless: nothing is remembered between cycles. The only recency rule is
//! that the most recent access event may alert while it is at most
//! [`ACCESS_RECENCY_WINDOW_MS`] away from the evaluation time.

use crate::services::models::{AccessEvent, AccessResult, Telemetry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recency window for access alerts
pub const ACCESS_RECENCY_WINDOW_MS: i64 = 60_000;

/// Alert severity as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Success,
    Warning,
    Critical,
}

/// What triggered an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighTemperature,
    AccessDenied,
    AccessLockout,
    ConfigurationSaved,
}

/// A user-facing alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

impl AlertEvent {
    /// Acknowledgement for a saved configuration; delivered even with notifications off
    pub fn configuration_saved(dataset_id: &str) -> Self {
        Self {
            kind: AlertKind::ConfigurationSaved,
            severity: AlertSeverity::Success,
            title: "Configuration saved".to_string(),
            message: format!("Now polling dataset {dataset_id}"),
        }
    }

    fn high_temperature(temperature: f64, threshold: f64) -> Self {
        Self {
            kind: AlertKind::HighTemperature,
            severity: AlertSeverity::Critical,
            title: "High temperature".to_string(),
            message: format!(
                "Temperature {temperature:.1}°C exceeds the warning threshold of {threshold:.1}°C"
            ),
        }
    }

    fn access_denied(event: &AccessEvent) -> Self {
        Self {
            kind: AlertKind::AccessDenied,
            severity: AlertSeverity::Warning,
            title: "Access denied".to_string(),
            message: format!(
                "Access denied for {}: {}",
                display_or_dash(&event.user_id),
                display_or_dash(&event.reason)
            ),
        }
    }

    fn access_lockout(event: &AccessEvent) -> Self {
        Self {
            kind: AlertKind::AccessLockout,
            severity: AlertSeverity::Critical,
            title: "Keypad locked out".to_string(),
            message: format!("Door terminal locked out: {}", display_or_dash(&event.reason)),
        }
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// Decides which alerts the current batch warrants
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator;

impl AlertEvaluator {
    /// Evaluate alerts; both sequences are ascending by timestamp
    pub fn evaluate(
        &self,
        telemetry: &[Telemetry],
        access: &[AccessEvent],
        now: DateTime<Utc>,
        notifications_enabled: bool,
    ) -> Vec<AlertEvent> {
        let mut alerts = Vec::new();

        if let Some(latest) = telemetry.last() {
            if let Some(threshold) = latest.warn_threshold {
                if latest.temperature > threshold {
                    alerts.push(AlertEvent::high_temperature(latest.temperature, threshold));
                }
            }
        }

        if let Some(latest) = access.last() {
            if is_recent(latest.timestamp, now) {
                match latest.result {
                    AccessResult::Denied => alerts.push(AlertEvent::access_denied(latest)),
                    AccessResult::Lockout => alerts.push(AlertEvent::access_lockout(latest)),
                    AccessResult::Granted | AccessResult::Other(_) => {}
                }
            }
        }

        filter_for_delivery(alerts, notifications_enabled)
    }
}

/// Apply the notification toggle: success alerts always pass, the rest only when enabled
pub fn filter_for_delivery(alerts: Vec<AlertEvent>, notifications_enabled: bool) -> Vec<AlertEvent> {
    if notifications_enabled {
        return alerts;
    }
    alerts
        .into_iter()
        .filter(|alert| alert.severity == AlertSeverity::Success)
        .collect()
}

fn is_recent(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - timestamp).num_milliseconds().abs() <= ACCESS_RECENCY_WINDOW_MS
}
