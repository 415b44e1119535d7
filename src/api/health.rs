//! Health endpoints

use super::{bad_request, invalid_body};
use crate::health::HealthError;
use crate::service::MonitorHandle;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub detailed: Option<String>,
}

impl HealthQuery {
    fn is_detailed(&self) -> bool {
        self.detailed
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

#[derive(Debug, Deserialize)]
pub struct HealthAction {
    pub action: Option<String>,
}

/// Body returned when the check itself could not run.
#[derive(Debug, Serialize)]
pub struct HealthFailure {
    pub status: &'static str,
    pub message: String,
    pub issues: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SyncAck {
    pub success: bool,
    pub message: &'static str,
}

fn failure(e: &HealthError) -> Response {
    error!(error = %e, "Health check failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(HealthFailure {
            status: "unhealthy",
            message: "Health check failed".to_string(),
            issues: 1,
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// GET /api/health?detailed=true
pub async fn get_health(
    State(state): State<MonitorHandle>,
    Query(query): Query<HealthQuery>,
) -> Response {
    match state.monitor.check_system_health().await {
        Ok(health) if query.is_detailed() => Json(health.as_ref().clone()).into_response(),
        Ok(health) => Json(health.summary()).into_response(),
        Err(e) => failure(&e),
    }
}

/// POST /api/health `{ "action": "fix" | "sync" }`
pub async fn post_health(
    State(state): State<MonitorHandle>,
    body: Result<Json<HealthAction>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return invalid_body(&rejection).into_response(),
    };
    let Some(action) = body.action else {
        return bad_request("Missing required field 'action'").into_response();
    };
    match action.as_str() {
        "fix" => {
            info!("Forced health check requested");
            state.monitor.invalidate().await;
            match state.monitor.check_system_health().await {
                Ok(health) => Json(health.as_ref().clone()).into_response(),
                Err(e) => failure(&e),
            }
        }
        "sync" => Json(SyncAck {
            success: true,
            message: "Sync acknowledged; automatic sync is not available, run the data sync job manually",
        })
        .into_response(),
        other => bad_request(format!("Unknown action '{other}'")).into_response(),
    }
}
