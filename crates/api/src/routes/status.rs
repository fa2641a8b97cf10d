//! Status Routes

use axum::{extract::State, Json};
use drowsiness::RenderModel;
use std::sync::Arc;

use crate::AppState;

/// Get the latest render model
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<RenderModel> {
    Json(state.status.borrow().clone())
}

/// Prometheus text exposition
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
