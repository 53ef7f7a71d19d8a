//! API models for the task endpoints
//!
//! The external contract is small: clients create a task, submit up to three
//! links to it, and poll its status until the archive URL appears.
//!
//! ```json
//! POST /tasks                -> {"task_id": 1}
//! POST /tasks/1/links        <- {"urls": ["https://cdn.example.com/cat.jpg"]}
//! GET  /tasks/1/status       -> {"status": "completed",
//!                                "archive_url": "http://localhost:8080/archives/Task_01.zip"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registry::TaskStatus;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskCreatedResponse {
    pub task_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AddLinksRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AckResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatusResponse {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActiveTaskSummary {
    pub task_id: u64,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActiveTasksResponse {
    pub tasks: Vec<ActiveTaskSummary>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
