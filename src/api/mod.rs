//! REST API module using Axum
//!
//! - `GET/POST /api/health`: health snapshot, summary, forced re-check
//! - `GET/POST /api/claude-issues`: issue queue inspection and updates

pub mod health;
pub mod issues;

use crate::service::MonitorHandle;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Error body for 4xx responses: `{ "error": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// `(status, body)` pair returned by handlers on client errors.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg)))
}

/// Malformed, incomplete or mistyped JSON bodies are a 400 with an
/// `ErrorResponse`, not axum's plain-text rejection.
pub(crate) fn invalid_body(rejection: &JsonRejection) -> ApiError {
    bad_request(format!("Invalid request body: {}", rejection.body_text()))
}

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `MONITOR_CORS_ORIGINS` to a comma-separated list of allowed origins,
/// e.g. the dashboard's dev server at `http://localhost:3000`.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match std::env::var("MONITOR_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// API routes without middleware layers.
pub fn api_routes(state: MonitorHandle) -> Router {
    Router::new()
        .route(
            "/health",
            get(health::get_health).post(health::post_health),
        )
        .route(
            "/claude-issues",
            get(issues::get_issues).post(issues::post_issues),
        )
        .with_state(state)
}

/// Create the complete application router.
pub fn create_app(state: MonitorHandle) -> Router {
    Router::new()
        .nest("/api", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer())
}
