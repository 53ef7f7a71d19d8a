//! In-memory task registry
//!
//! Plain key-value storage for task records behind a reader/writer lock.
//! All business rules (capacity, link limits, state transitions) live in the
//! orchestrator; the registry only stores and returns records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task {0} not found")]
    TaskNotFound(u64),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Lifecycle state of a task. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One client-initiated unit of work: collect a batch of URLs, download
/// them, produce one archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub status: TaskStatus,
    /// Relative path of the finished archive, set on completion.
    pub archive_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: u64) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: TaskStatus::Created,
            archive_path: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Thread-safe task store. Reads run in parallel, writes are exclusive.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<u64, Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a task by id. Never fails and does not validate content.
    pub fn save(&self, task: Task) {
        self.tasks.write().unwrap().insert(task.id, task);
    }

    /// Fetch a task by id.
    pub fn get(&self, id: u64) -> Result<Task> {
        self.tasks
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RegistryError::TaskNotFound(id))
    }

    /// All tasks still in a non-terminal state, ordered by id.
    pub fn active(&self) -> Vec<Task> {
        let mut active: Vec<Task> = self
            .tasks
            .read()
            .unwrap()
            .values()
            .filter(|task| !task.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|task| task.id);
        active
    }
}
