//! Presentation-owned state threaded into every cycle

use crate::client::TableName;
use crate::config::DashboardConfig;
use serde::{Deserialize, Serialize};

/// Settings and cursors owned by the presentation layer.
///
/// The scheduler reads a copy at the start of each cycle and never writes it
/// on its own; page cursors are passed as-is and clamped only in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSession {
    pub dataset_id: String,
    pub notifications_enabled: bool,
    pub telemetry_page: usize,
    pub access_page: usize,
    pub page_size: usize,
}

impl MonitorSession {
    pub fn is_configured(&self) -> bool {
        !self.dataset_id.trim().is_empty()
    }

    pub fn set_page(&mut self, table: TableName, page: usize) {
        match table {
            TableName::Telemetry => self.telemetry_page = page,
            TableName::Access => self.access_page = page,
        }
    }
}

impl From<&DashboardConfig> for MonitorSession {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            dataset_id: config.dataset_id.trim().to_string(),
            notifications_enabled: config.notifications_enabled,
            telemetry_page: 1,
            access_page: 1,
            page_size: config.page_size,
        }
    }
}

impl Default for MonitorSession {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}
