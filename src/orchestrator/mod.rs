//! Task orchestration core
//!
//! Owns the whole task lifecycle: creation under the global concurrency cap,
//! link accumulation, and the poll-triggered download/archive/cleanup
//! pipeline. All counters are instance state, so independent orchestrators
//! can coexist (one per test, one per process).
//!
//! Status polling is a two-phase contract: reads are pure unless the polled
//! task has a complete batch and nobody has claimed it yet, in which case the
//! polling request runs the pipeline inline. The claim flag guarantees a
//! batch is downloaded and archived at most once even under concurrent polls.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::archive::Archiver;
use crate::config::Config;
use crate::downloader::{DownloadOutcome, Downloader};
use crate::observability::Metrics;
use crate::registry::{Task, TaskRegistry, TaskStatus};

/// Concurrency cap: tasks in a non-terminal state count against this limit.
pub const MAX_ACTIVE_TASKS: u64 = 3;

/// Batch size: a task accepts this many links, and reaching it arms the
/// pipeline.
pub const MAX_LINKS_PER_TASK: usize = 3;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("server busy: maximum number of active tasks reached")]
    ServerBusy,

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("too many links: a task accepts at most 3")]
    TooManyLinks,
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// What a status poll reports back to the client.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: TaskStatus,
    pub archive_url: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerEntry {
    urls: Vec<String>,
    pipeline_started: bool,
}

/// Deterministic archive base name for a task, zero-padded to two digits.
pub fn archive_base_name(task_id: u64) -> String {
    format!("Task_{task_id:02}")
}

pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    downloader: Downloader,
    archiver: Archiver,
    metrics: Arc<Metrics>,
    /// Pending URL batches keyed by task id. Entries are dropped on the
    /// terminal transition.
    ledger: RwLock<HashMap<u64, LedgerEntry>>,
    task_counter: AtomicU64,
    active_tasks: AtomicU64,
    public_base_url: String,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        registry: Arc<TaskRegistry>,
        metrics: Arc<Metrics>,
    ) -> crate::downloader::Result<Self> {
        Ok(Self {
            registry,
            downloader: Downloader::new(config)?,
            archiver: Archiver::new(config.files.archives_dir.clone()),
            metrics,
            ledger: RwLock::new(HashMap::new()),
            task_counter: AtomicU64::new(0),
            active_tasks: AtomicU64::new(0),
            public_base_url: config.public_base_url(),
        })
    }

    /// Create a new task and return its id.
    ///
    /// Fails with `ServerBusy` while the active-task cap is reached. Slot
    /// reservation and task persistence happen together: a rejected creation
    /// never leaves the counter incremented.
    pub fn create_task(&self) -> Result<u64> {
        self.reserve_slot()?;

        let task_id = self.task_counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.registry.save(Task::new(task_id));
        self.ledger
            .write()
            .unwrap()
            .insert(task_id, LedgerEntry::default());

        self.metrics.task_created();
        info!(task_id, "Task created");
        Ok(task_id)
    }

    /// Append URLs to a task's batch and mark the task in progress.
    ///
    /// The batch is bounded: appending past `MAX_LINKS_PER_TASK` fails with
    /// `TooManyLinks` and leaves the batch untouched. Reachability is not
    /// checked here; a dead URL only surfaces when the pipeline runs.
    pub fn add_links(&self, task_id: u64, urls: &[String]) -> Result<()> {
        let mut task = self
            .registry
            .get(task_id)
            .map_err(|_| TaskError::TaskNotFound(task_id))?;

        // A terminal task's batch is closed for good.
        if task.status.is_terminal() {
            return Err(TaskError::TooManyLinks);
        }

        {
            let mut ledger = self.ledger.write().unwrap();
            // A concurrent poll may have settled the task after the registry
            // read above; a missing entry means the batch is closed.
            let entry = ledger
                .get_mut(&task_id)
                .ok_or(TaskError::TooManyLinks)?;

            if entry.urls.len() >= MAX_LINKS_PER_TASK
                || entry.urls.len() + urls.len() > MAX_LINKS_PER_TASK
            {
                return Err(TaskError::TooManyLinks);
            }
            entry.urls.extend(urls.iter().cloned());
        }

        task.status = TaskStatus::InProgress;
        task.updated_at = Utc::now();
        self.registry.save(task);

        info!(task_id, added = urls.len(), "Links accepted");
        Ok(())
    }

    /// Report a task's status, running the pipeline when its batch just
    /// became complete.
    ///
    /// Terminal tasks always return the stored result, so repeated polls
    /// never download or archive twice.
    pub async fn get_status(&self, task_id: u64) -> Result<StatusReport> {
        let task = self
            .registry
            .get(task_id)
            .map_err(|_| TaskError::TaskNotFound(task_id))?;

        if task.status.is_terminal() {
            return Ok(self.stored_report(&task));
        }

        match self.try_claim_batch(task_id) {
            Some(urls) => Ok(self.run_pipeline(task, urls).await),
            None => Ok(StatusReport {
                status: task.status,
                archive_url: None,
            }),
        }
    }

    /// Tasks still counted against the concurrency cap.
    pub fn active_tasks(&self) -> Vec<Task> {
        self.registry.active()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Claim the pipeline for a task whose batch is complete. Only the
    /// single caller that flips `pipeline_started` receives the batch;
    /// concurrent polls on the same task keep reading status instead of
    /// starting duplicate downloads.
    fn try_claim_batch(&self, task_id: u64) -> Option<Vec<String>> {
        let mut ledger = self.ledger.write().unwrap();
        let entry = ledger.get_mut(&task_id)?;

        if entry.urls.len() < MAX_LINKS_PER_TASK || entry.pipeline_started {
            return None;
        }
        entry.pipeline_started = true;
        Some(entry.urls.clone())
    }

    async fn run_pipeline(&self, mut task: Task, urls: Vec<String>) -> StatusReport {
        info!(task_id = task.id, links = urls.len(), "Batch complete, running pipeline");

        let outcomes = self.downloader.fetch_batch(&urls, task.id).await;
        let saved: Vec<PathBuf> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                DownloadOutcome::Saved(path) => {
                    self.metrics.file_downloaded();
                    Some(path)
                }
                DownloadOutcome::Failed { .. } => {
                    self.metrics.download_failed();
                    None
                }
            })
            .collect();

        if saved.is_empty() {
            warn!(task_id = task.id, "Every download in the batch failed");
            return self.finish_failed(task);
        }

        let base_name = archive_base_name(task.id);
        if let Err(err) = self.archiver.build(&base_name, &saved) {
            error!(task_id = task.id, error = %err, "Archive stage failed");
            self.archiver.remove_files(&saved);
            return self.finish_failed(task);
        }
        self.archiver.remove_files(&saved);

        let relative_path = format!("archives/{base_name}.zip");
        let archive_url = format!("{}/{}", self.public_base_url, relative_path);

        task.status = TaskStatus::Completed;
        task.archive_path = Some(relative_path);
        task.updated_at = Utc::now();
        self.registry.save(task.clone());
        self.settle(task.id);
        self.metrics.task_completed();

        info!(task_id = task.id, %archive_url, "Task completed");
        StatusReport {
            status: TaskStatus::Completed,
            archive_url: Some(archive_url),
        }
    }

    fn finish_failed(&self, mut task: Task) -> StatusReport {
        task.status = TaskStatus::Failed;
        task.updated_at = Utc::now();
        let task_id = task.id;
        self.registry.save(task);
        self.settle(task_id);
        self.metrics.task_failed();

        StatusReport {
            status: TaskStatus::Failed,
            archive_url: None,
        }
    }

    /// Release the capacity slot and drop the ledger entry. Runs exactly
    /// once per task, on its terminal transition.
    fn settle(&self, task_id: u64) {
        self.ledger.write().unwrap().remove(&task_id);
        self.active_tasks.fetch_sub(1, Ordering::AcqRel);
    }

    /// Reserve one slot under the active-task cap. The compare-exchange loop
    /// keeps concurrent creations from overshooting the cap.
    fn reserve_slot(&self) -> Result<()> {
        let mut current = self.active_tasks.load(Ordering::Acquire);
        loop {
            if current >= MAX_ACTIVE_TASKS {
                return Err(TaskError::ServerBusy);
            }
            match self.active_tasks.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }

    fn stored_report(&self, task: &Task) -> StatusReport {
        StatusReport {
            status: task.status,
            archive_url: task
                .archive_path
                .as_ref()
                .map(|path| format!("{}/{}", self.public_base_url, path)),
        }
    }
}
