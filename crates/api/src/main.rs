//! Drowsiness Monitor - Main Entry Point
//!
//! Reads perception samples from stdin, runs the escalation state machine,
//! and serves status and operator commands over HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alerting::AlertDispatcher;
use api::perception::read_perception;
use api::{init_logging, run_server, AppState, Monitor, MonitorInput, Settings};
use clap::Parser;
use drowsiness::{OperatorCommand, SystemController};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::BufReader;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn, Level};

/// Driver drowsiness detection and emergency stop monitor
#[derive(Parser, Debug)]
#[command(name = "drowsiness-monitor")]
#[command(version)]
#[command(about = "Escalates sustained eye closure into alarms and a simulated emergency stop")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP bind address (overrides server.bind_addr).
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Do not start the HTTP server.
    #[arg(long)]
    no_server: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));

    // The stdin reader parks a blocking thread; do not wait for it
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.server.bind_addr = bind;
    }
    if args.no_server {
        settings.server.enabled = false;
    }
    settings.validate()?;

    let level = if args.verbose { Level::DEBUG } else { settings.logging.level()? };
    init_logging(level, args.json || settings.logging.json)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Alarm after {}s of closed eyes, emergency stop after {} alarms",
        settings.monitor.alarm_seconds, settings.monitor.max_alarms
    );

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics exporter unavailable: {}", e);
            None
        }
    };

    let controller = SystemController::new(settings.monitor.clone())?;
    let alerts = AlertDispatcher::from_config(&settings.alerts);
    let (input_tx, input_rx) = mpsc::channel::<MonitorInput>(settings.runtime.input_queue_depth);
    let (monitor, status_rx) = Monitor::new(controller, alerts, settings.runtime.tick_interval());
    let monitor_task = tokio::spawn(monitor.run(input_rx));

    let perception_tx = input_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = read_perception(BufReader::new(tokio::io::stdin()), perception_tx).await {
            error!("Perception input failed: {}", e);
        }
    });

    let quit_tx = input_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = quit_tx.send(MonitorInput::Command(OperatorCommand::Quit)).await;
        }
    });

    let server = if settings.server.enabled {
        let state = Arc::new(AppState::new(input_tx.clone(), status_rx, metrics));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let addr = settings.server.bind_addr.clone();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = stop_rx.await;
            };
            if let Err(e) = run_server(&addr, state, shutdown).await {
                error!("API server failed: {}", e);
            }
        });
        Some((stop_tx, handle))
    } else {
        None
    };
    drop(input_tx);

    let report = monitor_task.await?;

    if let Some((stop_tx, handle)) = server {
        let _ = stop_tx.send(());
        let _ = handle.await;
    }

    info!(
        "Final report: total alarms {}, emergency mode {}, vehicle {}",
        report.total_alarms,
        if report.reached_emergency { "ACTIVATED" } else { "NOT ACTIVATED" },
        match (report.reached_emergency, report.emergency_completed) {
            (false, _) => "DRIVING",
            (true, true) => "SAFELY STOPPED",
            (true, false) => "STOPPING IN PROGRESS",
        }
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
