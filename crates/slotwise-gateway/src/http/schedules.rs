//! Mutation endpoints. Each one maps to a single [`Intent`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use slotwise_core::{ScheduleId, SlotId};
use slotwise_scheduler::{NewSchedule, ScheduleEdit};
use std::str::FromStr;
use std::sync::Arc;

use super::{api_error, service_error, ApiError};
use crate::app::AppState;
use crate::service::{Applied, Intent};

#[derive(Debug, Deserialize)]
pub struct SlotEdit {
    pub start_time: DateTime<Utc>,
    pub duration: f64,
}

async fn apply(state: &AppState, intent: Intent) -> Result<Json<Applied>, ApiError> {
    let mut service = state.service.lock().await;
    service
        .apply(intent, Utc::now())
        .map(Json)
        .map_err(service_error)
}

fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "INVALID_ID", format!("'{raw}' is not a valid id")))
}

/// POST /schedules
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewSchedule>,
) -> Result<(StatusCode, Json<Applied>), ApiError> {
    let applied = apply(&state, Intent::Create(new)).await?;
    Ok((StatusCode::CREATED, applied))
}

/// PUT /schedules/{id}
pub async fn edit_schedule_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(edit): Json<ScheduleEdit>,
) -> Result<Json<Applied>, ApiError> {
    let ScheduleEdit {
        name,
        frequency,
        start_time,
        end_time,
        duration,
    } = edit;
    let intent = Intent::EditSchedule {
        schedule_id: parse_id::<ScheduleId>(&id)?,
        name,
        frequency,
        start_time,
        end_time,
        duration,
    };
    apply(&state, intent).await
}

/// DELETE /schedules/{id}
pub async fn delete_schedule_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Applied>, ApiError> {
    let schedule_id = parse_id::<ScheduleId>(&id)?;
    apply(&state, Intent::DeleteSchedule { schedule_id }).await
}

/// PUT /schedules/{id}/slots/{slot_id}
pub async fn edit_slot_handler(
    State(state): State<Arc<AppState>>,
    Path((id, slot_id)): Path<(String, String)>,
    Json(edit): Json<SlotEdit>,
) -> Result<Json<Applied>, ApiError> {
    let intent = Intent::EditSlot {
        schedule_id: parse_id::<ScheduleId>(&id)?,
        slot_id: parse_id::<SlotId>(&slot_id)?,
        start_time: edit.start_time,
        duration: edit.duration,
    };
    apply(&state, intent).await
}

/// DELETE /schedules/{id}/slots/{slot_id}
pub async fn delete_slot_handler(
    State(state): State<Arc<AppState>>,
    Path((id, slot_id)): Path<(String, String)>,
) -> Result<Json<Applied>, ApiError> {
    let intent = Intent::DeleteSlot {
        schedule_id: parse_id::<ScheduleId>(&id)?,
        slot_id: parse_id::<SlotId>(&slot_id)?,
    };
    apply(&state, intent).await
}

/// DELETE /schedules
pub async fn clear_handler(State(state): State<Arc<AppState>>) -> Result<Json<Applied>, ApiError> {
    apply(&state, Intent::ClearAll).await
}

/// POST /intents: any mutation as `{"intent": "...", ...}`.
pub async fn intent_handler(
    State(state): State<Arc<AppState>>,
    Json(intent): Json<Intent>,
) -> Result<Json<Applied>, ApiError> {
    apply(&state, intent).await
}
