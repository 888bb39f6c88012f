//! Server Room Monitor - Main Entry Point
//!
//! `run` keeps polling and prints every committed report and alert; `once`
//! runs a single cycle and prints the report as JSON.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use server_room_monitor::{
    client::SheetsHttpClient,
    logging::{init_logging, LogConfig},
    monitoring::{
        alert_line, spawn_line_reader, ConsoleCommand, CycleOutcome, MonitorUpdate, PollScheduler,
        ReportFormatter,
    },
    MonitorConfig, TableName,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Server room monitor
#[derive(Parser, Debug)]
#[command(name = "server-room-monitor")]
#[command(about = "Poll server-room telemetry and access logs from a published spreadsheet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// TOML configuration file
    #[arg(long, global = true, env = "MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Spreadsheet identifier
    #[arg(long, global = true)]
    dataset_id: Option<String>,

    /// Poll interval in seconds
    #[arg(long, global = true)]
    interval_secs: Option<u64>,

    /// History rows per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Suppress warning and critical alerts
    #[arg(long, global = true)]
    no_notifications: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll until Ctrl-C; press Enter to refresh now
    Run {
        /// Telemetry history page to show
        #[arg(long, default_value_t = 1)]
        telemetry_page: usize,

        /// Access history page to show
        #[arg(long, default_value_t = 1)]
        access_page: usize,
    },
    /// Run one cycle and print the report as JSON
    Once {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<MonitorConfig> {
        let mut config =
            MonitorConfig::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(dataset_id) = &self.dataset_id {
            config.dashboard.dataset_id = dataset_id.trim().to_string();
        }
        if let Some(secs) = self.interval_secs {
            config.polling.interval = Duration::from_secs(secs);
        }
        if let Some(page_size) = self.page_size {
            config.dashboard.page_size = page_size;
        }
        if self.no_notifications {
            config.dashboard.notifications_enabled = false;
        }

        config.validate().context("Invalid command line options")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig::from_env().with_debug(cli.debug))
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let config = cli.load_config()?;
    let client = Arc::new(SheetsHttpClient::new(&config.source)?);
    let scheduler = Arc::new(PollScheduler::from_config(client, &config));
    let formatter = ReportFormatter::new(config.source_offset());

    match cli.command {
        Command::Run {
            telemetry_page,
            access_page,
        } => {
            scheduler.set_page(TableName::Telemetry, telemetry_page).await;
            scheduler.set_page(TableName::Access, access_page).await;
            run(scheduler, formatter).await
        }
        Command::Once { pretty } => once(&scheduler, pretty).await,
    }
}

async fn run(scheduler: Arc<PollScheduler>, formatter: ReportFormatter) -> anyhow::Result<()> {
    let printer = tokio::spawn(print_updates(scheduler.subscribe(), formatter));
    let handle = scheduler.start();
    let lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    let commands = tokio::spawn(read_commands(Arc::clone(&scheduler), lines));

    info!("Monitor running. Enter: refresh, 'dataset <id>', 'page <telemetry|access> <n>', 'notify <on|off>'");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    scheduler.stop();
    commands.abort();
    handle.await.context("Poll loop panicked")?;
    printer.abort();

    Ok(())
}

async fn once(scheduler: &PollScheduler, pretty: bool) -> anyhow::Result<()> {
    match scheduler.run_cycle().await {
        CycleOutcome::Committed(report) => {
            let json = if pretty {
                serde_json::to_string_pretty(report.as_ref())?
            } else {
                serde_json::to_string(report.as_ref())?
            };
            println!("{json}");
            Ok(())
        }
        CycleOutcome::Failed { status, error } => bail!("{status}: {error}"),
        outcome => bail!("{}", outcome.status()),
    }
}

async fn print_updates(mut updates: broadcast::Receiver<MonitorUpdate>, formatter: ReportFormatter) {
    loop {
        match updates.recv().await {
            Ok(update) => {
                match (&update.report, &update.error) {
                    (Some(report), _) => println!("{}", formatter.render(update.status, report)),
                    (None, Some(error)) => println!("[{}] {error}", update.status),
                    (None, None) if update.sequence > 0 => println!("[{}]", update.status),
                    (None, None) => {}
                }
                for alert in &update.alerts {
                    println!("{}", alert_line(alert));
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Display fell behind, skipped {skipped} updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn read_commands(scheduler: Arc<PollScheduler>, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        match ConsoleCommand::parse(&line) {
            Ok(ConsoleCommand::Refresh) => scheduler.trigger(),
            Ok(ConsoleCommand::SaveDataset(id)) => {
                if let Err(e) = scheduler.save_dataset(&id).await {
                    warn!("{e}");
                }
            }
            Ok(ConsoleCommand::Page(table, page)) => {
                scheduler.set_page(table, page).await;
                scheduler.trigger();
            }
            Ok(ConsoleCommand::Notifications(enabled)) => {
                scheduler.set_notifications_enabled(enabled).await;
                info!("Notifications {}", if enabled { "on" } else { "off" });
            }
            Err(message) => warn!("{message}"),
        }
    }
}
