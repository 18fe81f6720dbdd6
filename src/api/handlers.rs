//! Request handlers.
//!
//! Extractor rejections (malformed JSON, bad query strings) are converted into
//! `Validation` errors so they use the same envelope as every other failure.

use super::{AppState, response::ApiResponse};
use crate::{
    core::{
        audit::{self, LogPage, LogQuery},
        auto_close::AutoCloseResult,
        stats::{self, SchedulerStats},
        status::{self, SchedulerStatusView},
        trigger::{self, AutoCloseRequest, ManualTriggerRequest},
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::Deserialize;

const DEFAULT_STATS_DAYS: i64 = 30;

type ApiResult<T> = Result<Json<ApiResponse<T>>>;

/// Query string of the stats endpoint.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Window length, clamped to `1..=365`
    pub days: Option<i64>,
}

/// Liveness probe.
pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

/// `POST /api/assignments/scheduler/trigger`
pub async fn manual_trigger(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ManualTriggerRequest>, JsonRejection>,
) -> ApiResult<AutoCloseResult> {
    let Json(request) = payload.map_err(|e| Error::validation(e.body_text()))?;
    let result = trigger::manual_trigger(&state.database, &state.scheduler, &request).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// `POST /api/assignments/scheduler/auto-close`
///
/// The body is optional; an empty body uses the configured defaults.
pub async fn auto_close(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<AutoCloseResult> {
    let request: AutoCloseRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AutoCloseRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::validation(format!("Invalid request body: {e}")))?
    };
    let result = trigger::automatic_trigger(&state.database, &state.scheduler, &request).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// `GET /api/assignments/scheduler/status`
pub async fn status(State(state): State<AppState>) -> ApiResult<SchedulerStatusView> {
    let view = status::get_status(&state.database, &state.scheduler.name).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// `GET /api/assignments/scheduler/stats?days=N`
pub async fn stats(
    State(state): State<AppState>,
    query: std::result::Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<SchedulerStats> {
    let Query(query) = query.map_err(|e| Error::validation(e.body_text()))?;
    let days = stats::clamp_days(query.days.unwrap_or(DEFAULT_STATS_DAYS));
    let stats = stats::get_stats(&state.database, &state.scheduler.name, days).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// `GET /api/assignments/logs/:assignment_id?changeReason=&page=&limit=`
pub async fn assignment_logs(
    State(state): State<AppState>,
    assignment_id: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<Query<LogQuery>, QueryRejection>,
) -> ApiResult<LogPage> {
    let Path(assignment_id) = assignment_id.map_err(|e| Error::validation(e.body_text()))?;
    let Query(query) = query.map_err(|e| Error::validation(e.body_text()))?;
    let page = audit::list_logs(&state.database, assignment_id, &query).await?;
    Ok(Json(ApiResponse::success(page)))
}
