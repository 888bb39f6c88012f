//! Server room monitor
//!
//! Polls a published spreadsheet holding telemetry and access events from a
//! server-room controller, and turns each poll into an operational picture:
//! current readings, a short trend, 24-hour access tallies, alerts and
//! reverse-chronological history pages.
//!
//! # Layout
//!
//! - [`client`]: fetches a table and strips the query-response envelope
//! - [`services`]: pure stages (parse, aggregate, alert, paginate)
//! - [`monitoring`]: the poll scheduler, session state and terminal rendering
//! - [`config`], [`logging`], [`error`]: ambient plumbing

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitoring;
pub mod services;

// Re-export main types for convenience
pub use client::{SheetsHttpClient, SourceClient, TableName};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use monitoring::{CycleReport, MonitorStatus, MonitorUpdate, PollScheduler};
