//! One cycle's pure processing: parse, aggregate, alert, paginate
//!
//! Takes both raw payloads together so the access tally and the latest-access
//! alert see the same reading as the telemetry snapshot.

use crate::client::RawPayload;
use crate::monitoring::poll_scheduler::MonitorStatus;
use crate::monitoring::session::MonitorSession;
use crate::services::{
    paginate, AccessEvent, Aggregator, AlertEvaluator, AlertEvent, Page, RecordBatch,
    RecordParser, Summary, Telemetry,
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything one successful cycle commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub dataset_id: String,
    /// Always `Connected`: only successful cycles produce a report
    pub status: MonitorStatus,
    /// Evaluation time used for tallies and recency
    pub completed_at: DateTime<Utc>,
    pub batch: RecordBatch,
    pub summary: Summary,
    /// Alerts after the notification toggle was applied
    pub alerts: Vec<AlertEvent>,
    pub telemetry_page: Page<Telemetry>,
    pub access_page: Page<AccessEvent>,
}

/// The stage chain, configured once
#[derive(Debug, Clone)]
pub struct Pipeline {
    parser: RecordParser,
    aggregator: Aggregator,
    evaluator: AlertEvaluator,
}

impl Pipeline {
    /// `offset` is both the source time zone and the label time zone
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            parser: RecordParser::new(offset),
            aggregator: Aggregator::new(offset),
            evaluator: AlertEvaluator,
        }
    }

    /// Run all stages. Returns `None` when no usable telemetry row remains.
    pub fn process(
        &self,
        telemetry_raw: &RawPayload,
        access_raw: &RawPayload,
        session: &MonitorSession,
        now: DateTime<Utc>,
    ) -> Option<CycleReport> {
        let batch = RecordBatch {
            telemetry: self.parser.parse_telemetry(telemetry_raw),
            access: self.parser.parse_access(access_raw),
        };

        if batch.telemetry.is_empty() {
            debug!("No usable telemetry rows in this cycle");
            return None;
        }

        let summary = self.aggregator.summarize(&batch.telemetry, &batch.access, now);
        let alerts = self.evaluator.evaluate(
            &batch.telemetry,
            &batch.access,
            now,
            session.notifications_enabled,
        );
        let telemetry_page = paginate(&batch.telemetry, session.telemetry_page, session.page_size);
        let access_page = paginate(&batch.access, session.access_page, session.page_size);

        debug!(
            telemetry = batch.telemetry.len(),
            access = batch.access.len(),
            alerts = alerts.len(),
            "Pipeline stages complete"
        );

        Some(CycleReport {
            dataset_id: session.dataset_id.clone(),
            status: MonitorStatus::Connected,
            completed_at: now,
            batch,
            summary,
            alerts,
            telemetry_page,
            access_page,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}
