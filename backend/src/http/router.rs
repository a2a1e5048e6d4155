//! Router configuration for the HTTP API.
//!
//! Sets up routes and middleware (rate limit, CORS, security headers,
//! compression, tracing) and creates the axum router ready for serving.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;

use super::auth::require_api_key;
use super::handlers;
use super::rate_limit::enforce_rate_limit;
use super::state::AppState;
use crate::config::SecurityConfig;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/toggle", post(handlers::toggle_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::get_status))
        .route("/stats", get(handlers::get_stats))
        .route("/stats/summary", get(handlers::get_stats_summary))
        .route("/spaceapi.json", get(handlers::get_space_api))
        .merge(protected);

    if state.config.security.debug {
        app = app.nest_service("/ui", ServeDir::new(&state.config.ui_dir));
    }

    let app = app
        .layer(DefaultBodyLimit::max(16 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .layer(cors_layer(&state.config.security))
        .layer(CompressionLayer::new());

    with_security_headers(app)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(12 * 60 * 60));

    if !security.allowed_origins.is_empty() {
        let origins: Vec<HeaderValue> = security
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "skipping origin that is not a valid header value");
                    None
                }
            })
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    } else if security.debug {
        // Wildcard origins cannot be combined with credentials.
        base.allow_origin(Any)
    } else {
        base
    }
}

fn with_security_headers(router: Router<AppState>) -> Router<AppState> {
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::AppConfig;
    use crate::db::repositories::LocalRepository;
    use crate::http::state::Collaborators;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let mut config = AppConfig::default();
        config.security.debug = true;
        let state = AppState::new(
            config,
            Arc::new(LocalRepository::new()),
            Arc::new(SystemClock),
            Collaborators::default(),
        );
        let _router = create_router(state);
    }

    #[test]
    fn test_cors_with_origins() {
        let security = SecurityConfig {
            allowed_origins: vec!["https://example.com".to_string()],
            ..Default::default()
        };
        let _layer = cors_layer(&security);
    }
}
