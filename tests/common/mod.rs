//! Common test utilities
//!
//! Fixture builders for raw table rows, a query-response envelope writer, a
//! wiremock spreadsheet endpoint and a scripted in-memory [`SourceClient`].

#![allow(dead_code)]

pub mod gviz_mock;

pub use gviz_mock::MockSheetServer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use server_room_monitor::client::{RawPayload, SourceClient, TableName};
use server_room_monitor::error::{MonitorError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Timestamp cell as epoch milliseconds
pub fn ts(at: DateTime<Utc>) -> Value {
    json!(at.timestamp_millis())
}

/// Telemetry row with the commonly varied fields
pub fn telemetry_row(at: Value, temperature: f64, humidity: f64, warn: Option<f64>) -> Vec<Value> {
    vec![
        at,
        json!("rack-controller"),
        json!(temperature),
        json!(humidity),
        json!(true),
        json!(false),
        json!("NORMAL"),
        json!("LOCKED"),
        json!(-55),
        warn.map_or(Value::Null, |w| json!(w)),
        Value::Null,
    ]
}

/// Access row with the commonly varied fields
pub fn access_row(at: Value, user_id: &str, result: &str, reason: &str) -> Vec<Value> {
    vec![
        at,
        json!("door-terminal"),
        json!(user_id),
        json!(format!("User {user_id}")),
        json!(result),
        json!(reason),
        json!(0),
        json!(""),
        json!("LOCKED"),
    ]
}

pub fn payload(rows: Vec<Vec<Value>>) -> RawPayload {
    RawPayload::from_values(rows)
}

/// Wrap a payload the way the spreadsheet endpoint does
pub fn envelope(payload: &RawPayload) -> String {
    let body = json!({
        "version": "0.6",
        "reqId": "0",
        "status": "ok",
        "sig": "1234567",
        "table": payload,
    });
    format!("/*O_o*/\ngoogle.visualization.Query.setResponse({body});")
}

/// Scripted reply of the fake source
#[derive(Debug, Clone)]
pub enum Reply {
    Table(RawPayload),
    Transport,
    Format,
    /// Answer after a delay
    Slow(Duration, RawPayload),
}

/// In-memory source that answers from a script and counts calls
pub struct FakeSource {
    telemetry: Mutex<Reply>,
    access: Mutex<Reply>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    datasets: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new(telemetry: Reply, access: Reply) -> Self {
        Self {
            telemetry: Mutex::new(telemetry),
            access: Mutex::new(access),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            datasets: Mutex::new(Vec::new()),
        }
    }

    pub fn tables(telemetry: RawPayload, access: RawPayload) -> Self {
        Self::new(Reply::Table(telemetry), Reply::Table(access))
    }

    pub fn set_telemetry(&self, reply: Reply) {
        *self.telemetry.lock().unwrap() = reply;
    }

    pub fn set_access(&self, reply: Reply) {
        *self.access.lock().unwrap() = reply;
    }

    /// Number of table fetches so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Dataset identifiers requested, in order
    pub fn datasets(&self) -> Vec<String> {
        self.datasets.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    async fn fetch_table(&self, dataset_id: &str, table: TableName) -> Result<RawPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.datasets.lock().unwrap().push(dataset_id.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let reply = match table {
            TableName::Telemetry => self.telemetry.lock().unwrap().clone(),
            TableName::Access => self.access.lock().unwrap().clone(),
        };

        let result = match reply {
            Reply::Table(payload) => Ok(payload),
            Reply::Transport => Err(MonitorError::transport("connection refused")),
            Reply::Format => Err(MonitorError::format("unexpected envelope")),
            Reply::Slow(delay, payload) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
