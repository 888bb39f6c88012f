//! Poll cycle orchestration and presentation state

pub mod console;
pub mod display;
pub mod pipeline;
pub mod poll_scheduler;
pub mod session;

pub use console::{spawn_line_reader, ConsoleCommand};
pub use display::{alert_line, ReportFormatter};
pub use pipeline::{CycleReport, Pipeline};
pub use poll_scheduler::{
    CycleOutcome, MonitorStatus, MonitorUpdate, PollScheduler, SchedulerConfig,
};
pub use session::MonitorSession;
