use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::{
    models::{
        AckResponse, ActiveTaskSummary, ActiveTasksResponse, AddLinksRequest, HealthResponse,
        StatusResponse, TaskCreatedResponse,
    },
    state::AppState,
};
use crate::api::error::ApiError;

/// Task creation endpoint (POST /tasks)
///
/// Returns 201 with the new task id, or 503 while the active-task cap is
/// reached.
pub async fn create_task(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let task_id = state.orchestrator.create_task()?;

    Ok((StatusCode::CREATED, Json(TaskCreatedResponse { task_id })))
}

/// Link submission endpoint (POST /tasks/{id}/links)
///
/// URLs are validated syntactically at this boundary and appended to the
/// task's batch. The response is an acknowledgement only: nothing is
/// downloaded until the batch is complete and the task is polled.
pub async fn add_links(
    State(state): State<AppState>,
    Path(task_id): Path<u64>,
    Json(request): Json<AddLinksRequest>,
) -> Result<impl IntoResponse, ApiError> {
    super::validation::validate_links(&request.urls)
        .map_err(|err| ApiError::InvalidPayload(err.to_string()))?;

    state.orchestrator.add_links(task_id, &request.urls)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AckResponse {
            message: "links accepted, processing starts once the batch is complete".to_string(),
        }),
    ))
}

/// Status polling endpoint (GET /tasks/{id}/status)
///
/// Polling drives execution: the first poll that observes a complete batch
/// runs the download/archive pipeline inline, and its response carries the
/// archive URL. Later polls return the stored result.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.orchestrator.get_status(task_id).await?;

    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            status: report.status,
            archive_url: report.archive_url,
        }),
    ))
}

/// Active task listing (GET /tasks/active)
pub async fn active_tasks(State(state): State<AppState>) -> impl IntoResponse {
    let tasks: Vec<ActiveTaskSummary> = state
        .orchestrator
        .active_tasks()
        .into_iter()
        .map(|task| ActiveTaskSummary {
            task_id: task.id,
            status: task.status,
            created_at: task.created_at,
        })
        .collect();

    (StatusCode::OK, Json(ActiveTasksResponse { tasks }))
}

/// Health check endpoint (GET /health)
///
/// Everything runs in-process, so being able to answer at all means the
/// components are up.
pub async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("registry".to_string(), "healthy".to_string());
    components.insert("downloader".to_string(), "healthy".to_string());
    components.insert("archiver".to_string(), "healthy".to_string());

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
