use axum::{extract::State, Json};
use serde_json::{json, Value};
use slotwise_sync::PushReport;
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check with store size and last push outcome.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let service = state.service.lock().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "channel": service.sync().channel().name(),
        "schedules": service.store().len(),
        "sync": service.sync().pusher().latest_report(),
    }))
}

/// GET /sync: latest push report.
pub async fn sync_handler(State(state): State<Arc<AppState>>) -> Json<PushReport> {
    let service = state.service.lock().await;
    Json(service.sync().pusher().latest_report())
}
