//! Pure pipeline stages: parsing, aggregation, alerting and pagination

pub mod aggregator;
pub mod alert_evaluator;
pub mod models;
pub mod paginator;
pub mod record_parser;

pub use aggregator::{AccessTally, Aggregator, SignalQuality, Snapshot, Summary, TrendPoint};
pub use alert_evaluator::{AlertEvaluator, AlertEvent, AlertKind, AlertSeverity};
pub use models::{AccessEvent, AccessResult, RecordBatch, Telemetry};
pub use paginator::{paginate, Page};
pub use record_parser::RecordParser;
