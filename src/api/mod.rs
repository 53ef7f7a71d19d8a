//! HTTP adapter over the task orchestrator

pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use state::AppState;

/// Build the application router, including static serving of finished
/// archives under `/archives`.
pub fn app(state: AppState) -> Router {
    let archives_dir = state.config.files.archives_dir.clone();

    Router::new()
        .route("/tasks", post(services::create_task))
        .route("/tasks/active", get(services::active_tasks))
        .route("/tasks/{id}/links", post(services::add_links))
        .route("/tasks/{id}/status", get(services::get_status))
        .route("/health", get(services::health))
        .nest_service("/archives", ServeDir::new(archives_dir))
        .with_state(state)
}
