//! Issue queue endpoints

use super::{bad_request, invalid_body, ApiError, ErrorResponse};
use crate::issues::{Issue, IssueSeverity, IssueType, NewIssue};
use crate::service::MonitorHandle;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct IssuesQuery {
    pub format: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueList {
    pub issues: Vec<Issue>,
    pub total: usize,
    pub pending: usize,
}

/// POST body. Which fields are required depends on `action`.
#[derive(Debug, Deserialize)]
pub struct IssueAction {
    pub action: Option<String>,
    pub id: Option<String>,
    /// Resolution note for `resolve` / `fail`.
    #[serde(alias = "note")]
    pub response: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub severity: Option<IssueSeverity>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

impl ActionResponse {
    fn ok() -> Self {
        Self {
            success: true,
            id: None,
            removed: None,
        }
    }
}

fn not_found(id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("Issue '{id}' not found or not in a valid state"))),
    )
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| bad_request(format!("Missing required field '{field}'")))
}

/// GET /api/claude-issues?format=json|report&id=<id>
pub async fn get_issues(
    State(state): State<MonitorHandle>,
    Query(query): Query<IssuesQuery>,
) -> Response {
    if let Some(id) = query.id.as_deref() {
        return match state.issues.get(id).await {
            Some(issue) => Json(issue).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Issue '{id}' not found"))),
            )
                .into_response(),
        };
    }

    match query.format.as_deref() {
        Some("report") => {
            let report = state.issues.generate_issue_report().await;
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                report,
            )
                .into_response()
        }
        None | Some("json") => {
            let issues = state.issues.all_issues().await;
            let pending = issues
                .iter()
                .filter(|i| i.status == crate::issues::IssueStatus::Pending)
                .count();
            Json(IssueList {
                total: issues.len(),
                pending,
                issues,
            })
            .into_response()
        }
        Some(other) => bad_request(format!("Unknown format '{other}'")).into_response(),
    }
}

/// POST /api/claude-issues `{ "action": "add" | "start" | "resolve" | "fail" | "cleanup", ... }`
pub async fn post_issues(
    State(state): State<MonitorHandle>,
    body: Result<Json<IssueAction>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| invalid_body(&rejection))?;
    let action = require(body.action.as_deref(), "action")?;
    match action {
        "add" => {
            let title = require(body.title.as_deref(), "title")?;
            let description = require(body.description.as_deref(), "description")?;
            let issue = NewIssue::new(
                body.issue_type.unwrap_or(IssueType::System),
                body.severity.unwrap_or(IssueSeverity::Medium),
                title,
                description,
            )
            .with_context(body.context.unwrap_or(serde_json::Value::Null));
            let id = state.issues.add_issue(issue).await;
            Ok(Json(ActionResponse {
                id: Some(id),
                ..ActionResponse::ok()
            }))
        }
        "start" => {
            let id = require(body.id.as_deref(), "id")?;
            if state.issues.mark_in_progress(id).await {
                Ok(Json(ActionResponse::ok()))
            } else {
                Err(not_found(id))
            }
        }
        "resolve" | "fail" => {
            let id = require(body.id.as_deref(), "id")?;
            let note = body.response.clone();
            let updated = if action == "resolve" {
                state.issues.resolve_issue(id, note).await
            } else {
                state.issues.fail_issue(id, note).await
            };
            if updated {
                info!(id, action, "Issue closed via API");
                Ok(Json(ActionResponse::ok()))
            } else {
                Err(not_found(id))
            }
        }
        "cleanup" => {
            let removed = state.issues.cleanup_old_issues().await;
            Ok(Json(ActionResponse {
                removed: Some(removed),
                ..ActionResponse::ok()
            }))
        }
        other => Err(bad_request(format!("Unknown action '{other}'"))),
    }
}
