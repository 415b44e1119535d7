//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! `/api/health` and `/api/claude-issues` using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use taskdeck_monitor::api::create_app;
use taskdeck_monitor::{DataStore, MonitorConfig, MonitorHandle, StoreError};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

struct HealthyStore;

#[async_trait]
impl DataStore for HealthyStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn count_rows(&self, _table: &str) -> Result<u64, StoreError> {
        Ok(10)
    }
}

fn unconfigured_app() -> Router {
    unconfigured().1
}

fn unconfigured() -> (MonitorHandle, Router) {
    let handle = MonitorHandle::new(MonitorConfig::default(), None);
    let app = create_app(handle.clone());
    (handle, app)
}

fn healthy_app() -> Router {
    let store: Arc<dyn DataStore> = Arc::new(HealthyStore);
    create_app(MonitorHandle::new(MonitorConfig::default(), Some(store)))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

// ============================================================================
// /api/health
// ============================================================================

#[tokio::test]
async fn test_health_summary_when_healthy() {
    let app = healthy_app();
    let (status, json) = get_json(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["issues"], 0);
    assert_eq!(json["message"], "All systems operational");
}

#[tokio::test]
async fn test_health_summary_when_not_configured() {
    let app = unconfigured_app();
    let (status, json) = get_json(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["issues"], 4);
}

#[tokio::test]
async fn test_health_detailed_snapshot() {
    let app = unconfigured_app();
    let (status, json) = get_json(&app, "/api/health?detailed=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overall"], "unhealthy");
    for surface in ["dataStore", "database", "api", "sync"] {
        assert_eq!(json[surface]["status"], "unhealthy", "{surface}");
        assert!(json[surface]["lastCheck"].is_string(), "{surface}");
    }
    assert_eq!(json["dataStore"]["message"], "Data store not configured");
}

#[tokio::test]
async fn test_health_detailed_false_returns_summary() {
    let app = healthy_app();
    let (_, json) = get_json(&app, "/api/health?detailed=false").await;
    assert!(json.get("overall").is_none());
    assert!(json.get("issues").is_some());
}

#[tokio::test]
async fn test_health_post_fix_returns_snapshot() {
    let app = healthy_app();
    let (status, json) = post_json(&app, "/api/health", serde_json::json!({"action": "fix"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overall"], "healthy");
}

#[tokio::test]
async fn test_health_post_sync_acknowledges() {
    let app = healthy_app();
    let (status, json) = post_json(&app, "/api/health", serde_json::json!({"action": "sync"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_health_post_unknown_action_is_400() {
    let app = healthy_app();
    let (status, json) = post_json(&app, "/api/health", serde_json::json!({"action": "reboot"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("reboot"));
}

#[tokio::test]
async fn test_health_post_bad_body_is_json_400() {
    let app = healthy_app();
    for body in [
        serde_json::json!({}),
        serde_json::json!({"action": 7}),
        serde_json::json!("fix"),
    ] {
        let (status, json) = post_json(&app, "/api/health", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(json["error"].is_string(), "{body}");
    }
}

// ============================================================================
// /api/claude-issues
// ============================================================================

#[tokio::test]
async fn test_issue_lifecycle_over_http() {
    let app = healthy_app();

    let (status, json) = post_json(
        &app,
        "/api/claude-issues",
        serde_json::json!({
            "action": "add",
            "type": "database",
            "severity": "high",
            "title": "Slow queries",
            "description": "p95 above 2s",
            "context": {"table": "tasks"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = json["id"].as_str().unwrap().to_string();

    let (status, issue) = get_json(&app, &format!("/api/claude-issues?id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issue["status"], "pending");
    assert_eq!(issue["type"], "database");
    assert_eq!(issue["context"]["table"], "tasks");

    let (status, _) = post_json(
        &app,
        "/api/claude-issues",
        serde_json::json!({"action": "start", "id": id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        &app,
        "/api/claude-issues",
        serde_json::json!({"action": "resolve", "id": id, "response": "added index"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, issue) = get_json(&app, &format!("/api/claude-issues?id={id}")).await;
    assert_eq!(issue["status"], "resolved");
    assert_eq!(issue["claudeResponse"], "added index");

    // terminal issues cannot be reopened
    let (status, _) = post_json(
        &app,
        "/api/claude-issues",
        serde_json::json!({"action": "start", "id": id}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_issue_list_counts() {
    let (handle, app) = unconfigured();
    // the unhealthy check queues a data-store issue
    get(&app, "/api/health").await;
    handle.monitor.auto_fix_settled().await;

    let (status, json) = get_json(&app, "/api/claude-issues?format=json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["pending"], 1);
    assert_eq!(json["issues"][0]["type"], "data-store");
    assert_eq!(json["issues"][0]["severity"], "critical");
    assert_eq!(json["issues"][0]["autoFixAttempted"], true);
}

#[tokio::test]
async fn test_issue_report_is_plain_text() {
    let (handle, app) = unconfigured();
    let (status, body) = get(&app, "/api/claude-issues?format=report").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "No pending issues.");

    get(&app, "/api/health").await;
    handle.monitor.auto_fix_settled().await;
    let (_, body) = get(&app, "/api/claude-issues?format=report").await;
    let report = String::from_utf8(body).unwrap();
    assert!(report.contains("[CRITICAL] Data store connection failure"));
}

#[tokio::test]
async fn test_issue_unknown_id_is_404() {
    let app = healthy_app();

    let (status, _) = get(&app, "/api/claude-issues?id=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/api/claude-issues",
        serde_json::json!({"action": "resolve", "id": "nope"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_issue_missing_fields_are_400() {
    let app = healthy_app();

    let cases = [
        serde_json::json!({}),
        serde_json::json!({"id": "x"}),
        serde_json::json!({"action": "add", "title": "t", "description": "d", "severity": "urgent"}),
        serde_json::json!({"action": "add", "title": "t", "description": "d", "type": "network"}),
        serde_json::json!({"action": "add", "description": "no title"}),
        serde_json::json!({"action": "add", "title": "no description"}),
        serde_json::json!({"action": "start"}),
        serde_json::json!({"action": "resolve", "id": ""}),
        serde_json::json!({"action": "escalate", "id": "x"}),
    ];
    for body in cases {
        let (status, json) = post_json(&app, "/api/claude-issues", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(json["error"].is_string(), "{body}");
    }
}

#[tokio::test]
async fn test_issue_non_json_body_is_400() {
    let app = healthy_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/claude-issues")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_issue_cleanup_action() {
    let app = healthy_app();
    let (status, json) = post_json(
        &app,
        "/api/claude-issues",
        serde_json::json!({"action": "cleanup"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 0);
}
