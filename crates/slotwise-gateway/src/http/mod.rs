pub mod health;
pub mod schedules;
pub mod views;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::service::ServiceError;

/// Error half of every handler: status plus `{ "error", "code" }`.
pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, code: &str, message: impl std::fmt::Display) -> ApiError {
    (
        status,
        Json(json!({ "error": message.to_string(), "code": code })),
    )
}

/// 404 for missing ids, 422 for rejected input, 500 otherwise.
pub fn service_error(e: ServiceError) -> ApiError {
    let status = match &e {
        ServiceError::Scheduler(s) if s.is_not_found() => StatusCode::NOT_FOUND,
        ServiceError::Scheduler(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Sync(sync) => {
            error!(error = %sync, code = sync.code(), "could not queue snapshot");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.code(), &e)
}
