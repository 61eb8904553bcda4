use axum::{
    routing::{get, post, put},
    Router,
};
use slotwise_core::config::SlotwiseConfig;
use std::sync::Arc;

use crate::http::{health, schedules, views};
use crate::service::ScheduleService;

/// Central shared state, passed as `Arc<AppState>` to all handlers.
pub struct AppState {
    pub config: SlotwiseConfig,
    /// Single writer. `tokio::sync::Mutex` so handlers can hold it across
    /// the projection render without blocking the runtime.
    pub service: tokio::sync::Mutex<ScheduleService>,
}

impl AppState {
    pub fn new(config: SlotwiseConfig, service: ScheduleService) -> Self {
        Self {
            config,
            service: tokio::sync::Mutex::new(service),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/view", get(views::view_handler))
        .route("/slots", get(views::slots_handler))
        .route(
            "/schedules",
            get(views::schedules_handler)
                .post(schedules::create_handler)
                .delete(schedules::clear_handler),
        )
        .route(
            "/schedules/{id}",
            put(schedules::edit_schedule_handler).delete(schedules::delete_schedule_handler),
        )
        .route(
            "/schedules/{id}/slots/{slot_id}",
            put(schedules::edit_slot_handler).delete(schedules::delete_slot_handler),
        )
        .route("/intents", post(schedules::intent_handler))
        .route("/sync", get(health::sync_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
