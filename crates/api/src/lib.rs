//! Drowsiness Monitor Runtime
//!
//! Wires the escalation state machine to its collaborators: perception
//! lines on stdin, fire-and-forget alarm playback, and an HTTP server
//! exposing the render model and operator commands.

use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};
use drowsiness::{ModeView, RenderModel};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod monitor;
pub mod perception;
pub mod settings;

mod routes;

pub use monitor::{Monitor, MonitorInput};
pub use settings::{Settings, SettingsError};

/// Application state shared across handlers
pub struct AppState {
    /// Command channel into the monitor loop
    pub commands: mpsc::Sender<MonitorInput>,
    /// Latest render model
    pub status: watch::Receiver<RenderModel>,
    /// Prometheus exporter, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        commands: mpsc::Sender<MonitorInput>,
        status: watch::Receiver<RenderModel>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            commands,
            status,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub mode: ModeView,
    pub monitor_running: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/commands/reset", post(routes::commands::reset))
        .route("/api/v1/commands/test-alarm", post(routes::commands::test_alarm))
        .route("/metrics", get(routes::status::get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let monitor_running = !state.commands.is_closed();

    Json(HealthResponse {
        status: if monitor_running { "healthy" } else { "stopped" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        mode: state.status.borrow().mode,
        monitor_running,
    })
}

/// Initialize logging on stderr; stdout carries the shutdown report
pub fn init_logging(
    level: Level,
    json: bool,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Run the server until `shutdown` resolves
pub async fn run_server<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("API server stopped");
    Ok(())
}
