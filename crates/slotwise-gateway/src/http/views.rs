use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotwise_scheduler::view::{paginate, parse_jump, total_pages};
use slotwise_scheduler::{Page, ViewMode};
use std::sync::Arc;
use tracing::{debug, error};

use super::{api_error, ApiError};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub mode: Option<String>,
    /// 1-based; clamped into range.
    pub page: Option<usize>,
    /// Typed page entry. Ignored unless it names an existing page.
    pub jump: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub jump: Option<String>,
}

#[derive(Serialize)]
struct ViewBody<T> {
    mode: ViewMode,
    #[serde(flatten)]
    page: Page<T>,
}

/// GET /view?mode=slots|schedules&page=N&jump=N
pub async fn view_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Value>, ApiError> {
    let mode = match query.mode.as_deref() {
        Some(raw) => raw
            .parse::<ViewMode>()
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_VIEW_MODE", e))?,
        None => ViewMode::default(),
    };
    let request = PageRequest::new(query.page, query.jump.as_deref());
    render(&state, mode, request).await
}

/// GET /slots?page=N&jump=N
pub async fn slots_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let request = PageRequest::new(query.page, query.jump.as_deref());
    render(&state, ViewMode::Slots, request).await
}

/// GET /schedules?page=N&jump=N
pub async fn schedules_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let request = PageRequest::new(query.page, query.jump.as_deref());
    render(&state, ViewMode::Schedules, request).await
}

#[derive(Debug, Clone, Copy)]
struct PageRequest<'a> {
    page: usize,
    jump: Option<&'a str>,
}

impl<'a> PageRequest<'a> {
    fn new(page: Option<usize>, jump: Option<&'a str>) -> Self {
        Self {
            page: page.unwrap_or(1),
            jump,
        }
    }

    /// A valid jump wins; otherwise the requested page, clamped later.
    fn resolve(self, total_items: usize, page_size: usize) -> usize {
        self.jump
            .and_then(|input| parse_jump(input, total_pages(total_items, page_size)))
            .unwrap_or(self.page)
    }
}

async fn render(
    state: &AppState,
    mode: ViewMode,
    request: PageRequest<'_>,
) -> Result<Json<Value>, ApiError> {
    let projections = state.service.lock().await.store().projections();
    let page_size = state.config.view.page_size;
    debug!(?mode, page = request.page, jump = ?request.jump, page_size, "rendering view");

    let body = match mode {
        ViewMode::Slots => view_body(mode, &projections.time_slots, request, page_size),
        ViewMode::Schedules => view_body(mode, &projections.schedules, request, page_size),
    };
    body.map(Json)
}

fn view_body<T: Clone + Serialize>(
    mode: ViewMode,
    rows: &[T],
    request: PageRequest<'_>,
    page_size: usize,
) -> Result<Value, ApiError> {
    let page = request.resolve(rows.len(), page_size);
    serde_json::to_value(ViewBody {
        mode,
        page: paginate(rows, page, page_size),
    })
    .map_err(|e| {
        error!(error = %e, ?mode, "could not encode view");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "ENCODE_ERROR", e)
    })
}
