//! Plain-text rendering of a committed report for the terminal
//!
//! Rows mirror the history tables: newest first, one line per record, blank
//! text fields shown as `-`.

use crate::monitoring::pipeline::CycleReport;
use crate::monitoring::poll_scheduler::MonitorStatus;
use crate::services::aggregator::on_off;
use crate::services::{AccessEvent, AlertEvent, AlertSeverity, Page, Telemetry};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::Write;

/// Placeholder for blank text cells
pub const BLANK_CELL: &str = "-";

/// Renders reports in a fixed display offset
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    offset: FixedOffset,
}

impl ReportFormatter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// "15 Jan 10:30:05"
    pub fn timestamp(&self, ts: DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset)
            .format("%d %b %H:%M:%S")
            .to_string()
    }

    /// "Last update: 10:30:05", or "--" before the first commit
    pub fn last_update(&self, ts: Option<DateTime<Utc>>) -> String {
        match ts {
            Some(ts) => format!(
                "Last update: {}",
                ts.with_timezone(&self.offset).format("%H:%M:%S")
            ),
            None => "Last update: --".to_string(),
        }
    }

    pub fn telemetry_row(&self, t: &Telemetry) -> String {
        format!(
            "{} | {:.1} C | {:.1} % | F1 {} | F2 {} | {} | {}",
            self.timestamp(t.timestamp),
            t.temperature,
            t.humidity,
            on_off(t.fan1_on),
            on_off(t.fan2_on),
            or_blank(&t.alarm_state),
            or_blank(&t.door_state),
        )
    }

    pub fn access_row(&self, e: &AccessEvent) -> String {
        format!(
            "{} | {} | {} | {} | {} | {} | {}",
            self.timestamp(e.timestamp),
            or_blank(&e.user_id),
            or_blank(&e.display_name),
            or_blank(e.result.as_str()),
            or_blank(&e.reason),
            e.failed_count,
            or_blank(&e.door_state),
        )
    }

    /// Multi-line dashboard view of one report
    pub fn render(&self, status: MonitorStatus, report: &CycleReport) -> String {
        let summary = &report.summary;
        let mut out = String::new();

        let _ = writeln!(out, "[{status}] {}", self.last_update(Some(report.completed_at)));
        let _ = writeln!(
            out,
            "Temperature {} C | Humidity {} % | Fans {} | Wi-Fi {}",
            summary.temperature_label(),
            summary.humidity_label(),
            summary.fan_label(),
            summary.signal_label(),
        );
        if let Some(snapshot) = &summary.snapshot {
            let _ = writeln!(
                out,
                "Alarm {} | Door {} | Warn threshold {}",
                or_blank(&snapshot.alarm_state),
                or_blank(&snapshot.door_state),
                snapshot
                    .warn_threshold
                    .map_or_else(|| BLANK_CELL.to_string(), |t| format!("{t:.1} C")),
            );
        }
        let tally = summary.access_24h;
        let _ = writeln!(
            out,
            "Access 24h: {} granted, {} denied, {} lockout",
            tally.granted, tally.denied, tally.lockout
        );

        self.render_page(&mut out, "Telemetry", &report.telemetry_page, |t| {
            self.telemetry_row(t)
        });
        self.render_page(&mut out, "Access", &report.access_page, |e| self.access_row(e));

        out
    }

    fn render_page<T>(
        &self,
        out: &mut String,
        title: &str,
        page: &Page<T>,
        row: impl Fn(&T) -> String,
    ) {
        let _ = writeln!(
            out,
            "{title} (page {}/{}, {} records)",
            page.page, page.total_pages, page.total_items
        );
        for item in &page.items {
            let _ = writeln!(out, "  {}", row(item));
        }
    }
}

/// One line per alert, e.g. "[CRITICAL] High temperature: ..."
pub fn alert_line(alert: &AlertEvent) -> String {
    let tag = match alert.severity {
        AlertSeverity::Success => "OK",
        AlertSeverity::Warning => "WARNING",
        AlertSeverity::Critical => "CRITICAL",
    };
    format!("[{tag}] {}: {}", alert.title, alert.message)
}

fn or_blank(value: &str) -> &str {
    if value.trim().is_empty() {
        BLANK_CELL
    } else {
        value
    }
}
