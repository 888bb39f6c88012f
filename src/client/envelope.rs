//! Strict parser for the visualization-query response envelope
//!
//! The spreadsheet endpoint wraps its JSON body in a JavaScript callback:
//!
//! ```text
//! /*O_o*/
//! google.visualization.Query.setResponse({"version":"0.6","status":"ok","table":{...}});
//! ```
//!
//! Accepted grammar:
//!
//! ```text
//! ws* ["/*O_o*/" ws*] "google.visualization.Query.setResponse(" OBJECT ")" [";"] ws* EOF
//! ```
//!
//! Anything else is a [`MonitorError::Format`], including a body that is valid
//! JSON but does not describe a table.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Anti-hijacking comment some responses carry before the callback
const GUARD_PREFIX: &str = "/*O_o*/";

/// Callback opening the structured body
const CALLBACK_OPEN: &str = "google.visualization.Query.setResponse(";

/// One table as returned by the source, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    /// Column descriptors (labels are informational only; cells map by position)
    #[serde(default)]
    pub cols: Vec<RawColumn>,

    /// Rows in the order the source returned them
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

/// Column descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// One row: an ordered sequence of optional cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub c: Vec<Option<RawCell>>,
}

/// One cell: raw value `v` plus the source's formatted rendering `f`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    #[serde(default)]
    pub v: Option<Value>,
    #[serde(default)]
    pub f: Option<String>,
}

impl RawRow {
    /// Value of cell `index`, or `None` when the cell or its value is null/missing
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.c
            .get(index)
            .and_then(|cell| cell.as_ref())
            .and_then(|cell| cell.v.as_ref())
            .filter(|v| !v.is_null())
    }
}

impl RawPayload {
    /// Build a payload from rows of cell values, mostly for fixtures
    pub fn from_values(rows: Vec<Vec<Value>>) -> Self {
        Self {
            cols: Vec::new(),
            rows: rows
                .into_iter()
                .map(|cells| RawRow {
                    c: cells
                        .into_iter()
                        .map(|v| {
                            if v.is_null() {
                                None
                            } else {
                                Some(RawCell { v: Some(v), f: None })
                            }
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Body inside the callback
#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    table: Option<RawPayload>,
    #[serde(default)]
    errors: Vec<QueryIssue>,
}

#[derive(Debug, Deserialize)]
struct QueryIssue {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    detailed_message: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a complete response text into its table payload
pub fn parse_envelope(text: &str) -> Result<RawPayload> {
    let body = extract_body(text)?;

    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| MonitorError::format(format!("Envelope body is not a query response: {e}")))?;

    match response.status.as_str() {
        "ok" | "warning" => {}
        "error" => {
            let details = response
                .errors
                .iter()
                .map(|issue| {
                    issue
                        .detailed_message
                        .clone()
                        .or_else(|| issue.message.clone())
                        .unwrap_or_else(|| issue.reason.clone())
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(MonitorError::format(format!(
                "Source reported an error: {details}"
            )));
        }
        other => {
            return Err(MonitorError::format(format!(
                "Unknown response status '{other}'"
            )))
        }
    }

    let table = response
        .table
        .ok_or_else(|| MonitorError::format("Response has no table"))?;

    debug!(
        "Parsed envelope: {} columns, {} rows",
        table.cols.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Strip the wrapper and return the body between the callback parentheses
fn extract_body(text: &str) -> Result<&str> {
    let mut rest = text.trim_start();

    if let Some(after_guard) = rest.strip_prefix(GUARD_PREFIX) {
        rest = after_guard.trim_start();
    }

    let rest = rest.strip_prefix(CALLBACK_OPEN).ok_or_else(|| {
        MonitorError::format("Response does not start with the setResponse callback")
    })?;

    let rest = rest.trim_end();
    let rest = rest.strip_suffix(';').unwrap_or(rest);
    let body = rest
        .strip_suffix(')')
        .ok_or_else(|| MonitorError::format("Response callback is not closed"))?;

    let trimmed = body.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(MonitorError::format("Callback argument is not an object"));
    }

    Ok(trimmed)
}
