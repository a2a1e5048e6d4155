//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer.

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use super::dto::{HealthResponse, StatsSummary, ToggleRequest, ToggleResponse, WeeklyStat};
use super::error::AppError;
use super::state::AppState;
use crate::services::space_api::build_document;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match state.ledger.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => {
            warn!(error = %e, "ledger health check failed");
            "error".to_string()
        }
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    }))
}

/// GET /status
///
/// `true` or `false` as plain text; an empty ledger reads as closed.
pub async fn get_status(State(state): State<AppState>) -> Result<String, AppError> {
    let is_open = state.ledger.current_state().await?;
    Ok(is_open.to_string())
}

/// POST /toggle
///
/// The body is parsed by hand so that an empty or malformed body is a 400
/// with the usual error shape.
pub async fn toggle_status(
    State(state): State<AppState>,
    body: Bytes,
) -> HandlerResult<ToggleResponse> {
    let request: ToggleRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting toggle body");
        AppError::BadRequest("Invalid JSON".to_string())
    })?;

    let credential = request.credential();
    let outcome = state.toggles.toggle(credential.as_ref()).await?;

    Ok(Json(ToggleResponse {
        is_open: outcome.is_open(),
    }))
}

/// GET /stats
///
/// Weekly open-probability breakdown; an empty array when there is no data.
pub async fn get_stats(State(state): State<AppState>) -> HandlerResult<Vec<WeeklyStat>> {
    Ok(Json(state.stats.weekly_breakdown().await?))
}

/// GET /stats/summary
pub async fn get_stats_summary(State(state): State<AppState>) -> HandlerResult<StatsSummary> {
    Ok(Json(state.stats.summary().await?))
}

/// GET /spaceapi.json
pub async fn get_space_api(State(state): State<AppState>) -> Result<Response, AppError> {
    let latest = state.ledger.get_latest().await?;
    let document = build_document(&state.space, latest.as_ref());

    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "no-cache, must-revalidate"),
        ],
        Json(document),
    )
        .into_response())
}
