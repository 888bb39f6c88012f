//! Source client for the published spreadsheet tables
//!
//! The monitor reads two tables from one dataset. [`SourceClient`] is the seam
//! between the poll scheduler and the network; [`SheetsHttpClient`] is the
//! production implementation and tests substitute their own.

pub mod envelope;
pub mod http_client;

pub use envelope::{parse_envelope, RawCell, RawColumn, RawPayload, RawRow};
pub use http_client::SheetsHttpClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The logical tables exposed by the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    /// Periodic device telemetry
    Telemetry,
    /// Door terminal access events
    Access,
}

impl TableName {
    /// Sheet name used in the query string
    pub fn sheet_name(&self) -> &'static str {
        match self {
            TableName::Telemetry => "telemetry_logs",
            TableName::Access => "access_logs",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// Read-only access to one named table of a dataset
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetch a table's payload.
    ///
    /// Fails with a transport error on network/timeout/HTTP-status failure and a
    /// format error when the response envelope does not match. No retries.
    async fn fetch_table(&self, dataset_id: &str, table: TableName) -> Result<RawPayload>;
}
