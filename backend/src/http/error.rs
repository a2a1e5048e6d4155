//! HTTP error handling and response types.
//!
//! Every failure is answered with `{"error": "<reason>"}`. Storage detail
//! is logged here and never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::db::repository::RepositoryError;
use crate::services::card_lookup::LookupError;
use crate::services::toggle::ToggleError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request body
    BadRequest(String),
    Unauthorized,
    CooldownActive(String),
    RateLimited,
    /// The card registry failed
    Upstream(LookupError),
    /// A dependency exceeded its deadline
    Timeout(String),
    /// Storage failure
    Repository(RepositoryError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::CooldownActive(_) | AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Repository(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) => msg,
            AppError::Unauthorized => "Invalid or missing API key".to_string(),
            AppError::CooldownActive(msg) => msg,
            AppError::RateLimited => "rate limit exceeded".to_string(),
            AppError::Upstream(e) => {
                warn!(error = %e, "card lookup failed");
                match e {
                    LookupError::Rejected(_) => "Card manager returned error".to_string(),
                    _ => "Failed to contact card manager".to_string(),
                }
            }
            AppError::Timeout(detail) => {
                warn!(%detail, "deadline exceeded");
                "Operation timed out".to_string()
            }
            AppError::Repository(e) if e.is_timeout() => {
                warn!(error = %e, "storage deadline exceeded");
                "Database operation timed out".to_string()
            }
            AppError::Repository(e) => {
                error!(error = %e, "storage failure");
                "Internal server error".to_string()
            }
        };

        (status, Json(ApiError::new(message))).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<ToggleError> for AppError {
    fn from(err: ToggleError) -> Self {
        match err {
            ToggleError::CooldownActive { .. } => AppError::CooldownActive(err.to_string()),
            ToggleError::UpstreamFailure(e) => AppError::Upstream(e),
            ToggleError::Timeout(detail) => AppError::Timeout(detail),
            ToggleError::Storage(e) => AppError::Repository(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cooldown = ToggleError::CooldownActive {
            cooldown: Duration::from_secs(60),
        };
        assert_eq!(AppError::from(cooldown).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::from(ToggleError::UpstreamFailure(LookupError::Rejected(500))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(ToggleError::Timeout("slow".into())).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::from(RepositoryError::query("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_storage_detail_not_exposed() {
        let response = AppError::from(RepositoryError::query("relation sede_statuses missing"))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
