//! Poll scheduler: drives fetch → parse → aggregate → alert → paginate
//!
//! One loop task fires on a fixed interval or on a manual trigger. Every cycle
//! runs under a single-flight guard, so two cycles never race to commit. A
//! cycle either commits a complete report or leaves the last one in place and
//! only moves the status indicator.

use crate::client::{RawPayload, SourceClient, TableName};
use crate::config::MonitorConfig;
use crate::error::{ErrorReporter, MonitorError, Result};
use crate::monitoring::pipeline::{CycleReport, Pipeline};
use crate::monitoring::session::MonitorSession;
use crate::services::alert_evaluator::filter_for_delivery;
use crate::services::AlertEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info};

/// Connectivity indicator; reflects the most recent outcome only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// No cycle has finished yet
    Idle,
    Connected,
    /// Transport failure or timeout
    Offline,
    /// Response did not match the expected format
    Error,
    /// Fetch succeeded but no telemetry row was usable
    NoData,
    /// No dataset identifier set
    NotConfigured,
}

impl MonitorStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, MonitorStatus::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MonitorStatus::Idle => "Waiting for first poll",
            MonitorStatus::Connected => "Connected",
            MonitorStatus::Offline => "Offline",
            MonitorStatus::Error => "Connection error",
            MonitorStatus::NoData => "No telemetry data",
            MonitorStatus::NotConfigured => "Spreadsheet not configured",
        }
    }

    fn for_error(error: &MonitorError) -> Self {
        if error.is_transport() {
            MonitorStatus::Offline
        } else {
            MonitorStatus::Error
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one cycle
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Committed(Arc<CycleReport>),
    NoData,
    NotConfigured,
    Failed {
        status: MonitorStatus,
        error: String,
    },
}

impl CycleOutcome {
    pub fn status(&self) -> MonitorStatus {
        match self {
            CycleOutcome::Committed(_) => MonitorStatus::Connected,
            CycleOutcome::NoData => MonitorStatus::NoData,
            CycleOutcome::NotConfigured => MonitorStatus::NotConfigured,
            CycleOutcome::Failed { status, .. } => *status,
        }
    }
}

/// Broadcast to presentation subscribers
#[derive(Debug, Clone)]
pub struct MonitorUpdate {
    /// Cycle sequence number (0 for updates outside a cycle)
    pub sequence: u64,
    pub status: MonitorStatus,
    /// Committed report, when this update carries a new one
    pub report: Option<Arc<CycleReport>>,
    /// Alerts to show now
    pub alerts: Vec<AlertEvent>,
    pub error: Option<String>,
}

/// Scheduler timing
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Bound on both table fetches together
    pub fetch_timeout: Duration,
}

impl From<&MonitorConfig> for SchedulerConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            interval: config.polling.interval,
            fetch_timeout: config.source.fetch_timeout,
        }
    }
}

#[derive(Debug)]
struct SchedulerState {
    status: MonitorStatus,
    report: Option<Arc<CycleReport>>,
    last_error: Option<String>,
    last_update: Option<DateTime<Utc>>,
    sequence: u64,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            status: MonitorStatus::Idle,
            report: None,
            last_error: None,
            last_update: None,
            sequence: 0,
        }
    }
}

/// Drives poll cycles
pub struct PollScheduler {
    client: Arc<dyn SourceClient>,
    pipeline: Pipeline,
    config: SchedulerConfig,
    session: RwLock<MonitorSession>,
    state: RwLock<SchedulerState>,
    /// Single-flight guard: held for the whole cycle
    in_flight: Mutex<()>,
    /// Manual trigger; extra triggers during a cycle collapse into one permit
    trigger: Notify,
    updates_tx: broadcast::Sender<MonitorUpdate>,
    shutdown_tx: watch::Sender<bool>,
}

impl PollScheduler {
    pub fn new(
        client: Arc<dyn SourceClient>,
        pipeline: Pipeline,
        config: SchedulerConfig,
        session: MonitorSession,
    ) -> Self {
        let (updates_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            client,
            pipeline,
            config,
            session: RwLock::new(session),
            state: RwLock::new(SchedulerState::default()),
            in_flight: Mutex::new(()),
            trigger: Notify::new(),
            updates_tx,
            shutdown_tx,
        }
    }

    /// Build a scheduler from the loaded configuration
    pub fn from_config(client: Arc<dyn SourceClient>, config: &MonitorConfig) -> Self {
        Self::new(
            client,
            Pipeline::new(config.source_offset()),
            SchedulerConfig::from(config),
            MonitorSession::from(&config.dashboard),
        )
    }

    /// Subscribe to status/report updates
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorUpdate> {
        self.updates_tx.subscribe()
    }

    pub async fn status(&self) -> MonitorStatus {
        self.state.read().await.status
    }

    /// Last committed report, if any cycle has committed
    pub async fn latest_report(&self) -> Option<Arc<CycleReport>> {
        self.state.read().await.report.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_update
    }

    /// Copy of the current session
    pub async fn session(&self) -> MonitorSession {
        self.session.read().await.clone()
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) {
        self.session.write().await.notifications_enabled = enabled;
    }

    /// Move a table's page cursor; takes effect on the next cycle
    pub async fn set_page(&self, table: TableName, page: usize) {
        self.session.write().await.set_page(table, page);
    }

    /// Save a new dataset identifier, acknowledge it and refresh
    pub async fn save_dataset(&self, dataset_id: &str) -> Result<()> {
        let dataset_id = dataset_id.trim();
        if dataset_id.is_empty() {
            return Err(MonitorError::invalid_input("Dataset identifier cannot be blank"));
        }

        let notifications_enabled = {
            let mut session = self.session.write().await;
            session.dataset_id = dataset_id.to_string();
            session.notifications_enabled
        };
        info!("Dataset identifier saved: {dataset_id}");

        let status = self.status().await;
        self.publish(MonitorUpdate {
            sequence: 0,
            status,
            report: None,
            alerts: filter_for_delivery(
                vec![AlertEvent::configuration_saved(dataset_id)],
                notifications_enabled,
            ),
            error: None,
        });

        self.trigger();
        Ok(())
    }

    /// Request a manual cycle from the running loop
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Start the poll loop; the first cycle runs immediately
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(
                "Starting poll loop (interval: {}ms)",
                scheduler.config.interval.as_millis()
            );

            let mut ticker = interval(scheduler.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *shutdown_rx.borrow_and_update() {
                    break;
                }

                tokio::select! {
                    _ = ticker.tick() => debug!("Scheduled poll"),
                    _ = scheduler.trigger.notified() => debug!("Manual poll"),
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }

                scheduler.run_cycle().await;
            }

            info!("Poll loop stopped");
        })
    }

    /// Ask the loop to exit after the current cycle
    pub fn stop(&self) {
        info!("Stopping poll loop");
        self.shutdown_tx.send_replace(true);
    }

    /// Run one cycle now, waiting behind any cycle already in flight
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.in_flight.lock().await;
        let started = Instant::now();
        let session = self.session.read().await.clone();

        if !session.is_configured() {
            debug!("Skipping cycle: no dataset configured");
            return self.record_outcome(CycleOutcome::NotConfigured, None).await;
        }

        let (telemetry_raw, access_raw) = match self.fetch_both(&session.dataset_id).await {
            Ok(payloads) => payloads,
            Err(e) => {
                ErrorReporter::log_error(&e, "poll_scheduler", "fetch");
                let outcome = CycleOutcome::Failed {
                    status: MonitorStatus::for_error(&e),
                    error: e.to_string(),
                };
                return self.record_outcome(outcome, None).await;
            }
        };

        let now = Utc::now();
        let outcome = match self.pipeline.process(&telemetry_raw, &access_raw, &session, now) {
            Some(report) => CycleOutcome::Committed(Arc::new(report)),
            None => CycleOutcome::NoData,
        };

        debug!("Cycle finished in {:?}", started.elapsed());
        self.record_outcome(outcome, Some(now)).await
    }

    /// Fetch both tables concurrently under one bounded timeout
    async fn fetch_both(
        &self,
        dataset_id: &str,
    ) -> Result<(RawPayload, RawPayload)> {
        let fetch = async {
            tokio::try_join!(
                self.client.fetch_table(dataset_id, TableName::Telemetry),
                self.client.fetch_table(dataset_id, TableName::Access),
            )
        };

        match timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::timeout(format!(
                "Fetching tables took longer than {:?}",
                self.config.fetch_timeout
            ))),
        }
    }

    /// Apply an outcome to the shared state and notify subscribers
    async fn record_outcome(
        &self,
        outcome: CycleOutcome,
        now: Option<DateTime<Utc>>,
    ) -> CycleOutcome {
        let update = {
            let mut state = self.state.write().await;
            state.sequence += 1;
            state.status = outcome.status();

            let mut update = MonitorUpdate {
                sequence: state.sequence,
                status: state.status,
                report: None,
                alerts: Vec::new(),
                error: None,
            };

            match &outcome {
                CycleOutcome::Committed(report) => {
                    state.report = Some(Arc::clone(report));
                    state.last_error = None;
                    state.last_update = now;
                    update.report = Some(Arc::clone(report));
                    update.alerts = report.alerts.clone();
                    info!(
                        sequence = state.sequence,
                        telemetry = report.batch.telemetry.len(),
                        access = report.batch.access.len(),
                        alerts = report.alerts.len(),
                        "Committed cycle: temperature {} humidity {}",
                        report.summary.temperature_label(),
                        report.summary.humidity_label()
                    );
                }
                CycleOutcome::Failed { error, .. } => {
                    state.last_error = Some(error.clone());
                    update.error = Some(error.clone());
                }
                CycleOutcome::NoData | CycleOutcome::NotConfigured => {
                    info!(sequence = state.sequence, "Cycle status: {}", state.status);
                }
            }

            update
        };

        self.publish(update);
        outcome
    }

    fn publish(&self, update: MonitorUpdate) {
        // No subscribers is fine
        let _ = self.updates_tx.send(update);
    }
}
