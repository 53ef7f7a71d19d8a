use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use zipbox::api::models::{ActiveTasksResponse, StatusResponse, TaskCreatedResponse};
use zipbox::api::state::AppState;
use zipbox::config::Config;
use zipbox::observability::Metrics;
use zipbox::orchestrator::Orchestrator;
use zipbox::registry::{TaskRegistry, TaskStatus};

/// Creates a minimal config for testing, with storage directories living in
/// an isolated temp dir. The required fields mirror a production file.
fn create_test_config(temp_dir: &TempDir) -> Config {
    let config_toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 8080
timeout_secs = 5

[files]
max_file_size = "10MB"
allowed_extensions = ["jpg", "png"]
downloads_dir = "{downloads}"
archives_dir = "{archives}"
        "#,
        downloads = temp_dir.path().join("downloads").display(),
        archives = temp_dir.path().join("archives").display(),
    );

    toml::from_str(&config_toml).expect("Failed to parse test config")
}

/// Builds a test app with isolated dependencies
fn build_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&temp_dir);

    let registry = Arc::new(TaskRegistry::new());
    let metrics = Arc::new(Metrics::new());
    let orchestrator =
        Orchestrator::new(&config, registry, metrics).expect("Failed to build orchestrator");

    let state = AppState::new(config, orchestrator);
    (zipbox::api::app(state), temp_dir)
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_task_returns_sequential_ids() {
    let (app, _temp_dir) = build_test_app();

    let response = app.clone().oneshot(post_empty("/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: TaskCreatedResponse = body_json(response).await;
    assert_eq!(created.task_id, 1);

    let response = app.oneshot(post_empty("/tasks")).await.unwrap();
    let created: TaskCreatedResponse = body_json(response).await;
    assert_eq!(created.task_id, 2);
}

#[tokio::test]
async fn test_create_task_rejected_beyond_capacity() {
    let (app, _temp_dir) = build_test_app();

    for _ in 0..3 {
        let response = app.clone().oneshot(post_empty("/tasks")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.oneshot(post_empty("/tasks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_add_links_unknown_task() {
    let (app, _temp_dir) = build_test_app();

    let request = post_json(
        "/tasks/99/links",
        json!({"urls": ["https://example.com/a.jpg"]}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_links_accepted() {
    let (app, _temp_dir) = build_test_app();

    app.clone().oneshot(post_empty("/tasks")).await.unwrap();

    let request = post_json(
        "/tasks/1/links",
        json!({"urls": ["https://example.com/a.jpg", "https://example.com/b.png"]}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_add_links_rejects_invalid_url() {
    let (app, _temp_dir) = build_test_app();

    app.clone().oneshot(post_empty("/tasks")).await.unwrap();

    let request = post_json("/tasks/1/links", json!({"urls": ["not a url"]}));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = post_json("/tasks/1/links", json!({"urls": []}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_links_rejects_oversized_batch() {
    let (app, _temp_dir) = build_test_app();

    app.clone().oneshot(post_empty("/tasks")).await.unwrap();

    // Four at once is over the batch size
    let request = post_json(
        "/tasks/1/links",
        json!({"urls": [
            "https://example.com/a.jpg",
            "https://example.com/b.jpg",
            "https://example.com/c.jpg",
            "https://example.com/d.jpg"
        ]}),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_links_overflow_leaves_batch_unchanged() {
    let (app, _temp_dir) = build_test_app();

    app.clone().oneshot(post_empty("/tasks")).await.unwrap();

    let request = post_json(
        "/tasks/1/links",
        json!({"urls": ["https://example.com/a.jpg", "https://example.com/b.jpg"]}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // 2 + 2 would exceed the cap of 3
    let request = post_json(
        "/tasks/1/links",
        json!({"urls": ["https://example.com/c.jpg", "https://example.com/d.jpg"]}),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The rejected batch must not have been recorded: one more still fits
    let request = post_json("/tasks/1/links", json!({"urls": ["https://example.com/c.jpg"]}));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_status_unknown_task() {
    let (app, _temp_dir) = build_test_app();

    let response = app.oneshot(get("/tasks/42/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_poll_before_batch_is_complete() {
    let (app, _temp_dir) = build_test_app();

    app.clone().oneshot(post_empty("/tasks")).await.unwrap();

    let response = app.clone().oneshot(get("/tasks/1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status: StatusResponse = body_json(response).await;
    assert_eq!(status.status, TaskStatus::Created);
    assert!(status.archive_url.is_none());

    let request = post_json("/tasks/1/links", json!({"urls": ["https://example.com/a.jpg"]}));
    app.clone().oneshot(request).await.unwrap();

    let response = app.oneshot(get("/tasks/1/status")).await.unwrap();
    let status: StatusResponse = body_json(response).await;
    assert_eq!(status.status, TaskStatus::InProgress);
    assert!(status.archive_url.is_none());
}

#[tokio::test]
async fn test_non_numeric_task_id_rejected() {
    let (app, _temp_dir) = build_test_app();

    let response = app.oneshot(get("/tasks/abc/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_active_tasks_listing() {
    let (app, _temp_dir) = build_test_app();

    let response = app.clone().oneshot(get("/tasks/active")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing: ActiveTasksResponse = body_json(response).await;
    assert!(listing.tasks.is_empty());

    app.clone().oneshot(post_empty("/tasks")).await.unwrap();
    app.clone().oneshot(post_empty("/tasks")).await.unwrap();

    let response = app.oneshot(get("/tasks/active")).await.unwrap();
    let listing: ActiveTasksResponse = body_json(response).await;
    assert_eq!(listing.tasks.len(), 2);
    assert_eq!(listing.tasks[0].task_id, 1);
    assert_eq!(listing.tasks[0].status, TaskStatus::Created);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _temp_dir) = build_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: serde_json::Value = body_json(response).await;
    assert_eq!(
        health.get("status").and_then(|v| v.as_str()),
        Some("healthy")
    );
    let components = health.get("components").unwrap().as_object().unwrap();
    assert!(components.contains_key("api"));
    assert!(components.contains_key("registry"));
    assert!(health.get("version").is_some());
}
