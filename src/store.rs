//! In-memory task store.
//!
//! [`TaskStore`] is the single owner of every [`Task`] and its file states. One
//! `RwLock` covers the whole map: readers take a deep copy under the read lock,
//! and every file mutation recomputes the owning task's aggregate status under the
//! same write lock, so the derived status always reflects a fully applied state.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{FileState, FileStatus, Job, Task, TaskId, TaskStatus};

/// Authoritative collection of tasks
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

/// Trim every URL and drop the empty ones
pub fn normalize_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|u| u.as_ref().trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

impl TaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task with one pending file per URL.
    ///
    /// URLs are trimmed and empty entries dropped. Returns a copy of the stored task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when no URL remains after trimming.
    pub async fn create<I, S>(&self, urls: I) -> Result<Task>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = normalize_urls(urls);
        if urls.is_empty() {
            return Err(Error::InvalidInput(
                "task must contain at least one URL".into(),
            ));
        }

        let now = Utc::now();
        let files = urls.into_iter().map(FileState::pending).collect();

        let mut tasks = self.tasks.write().await;
        let mut id = TaskId::generate();
        while tasks.contains_key(&id) {
            id = TaskId::generate();
        }

        let task = Task {
            id: id.clone(),
            files,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tasks.insert(id, task.clone());
        Ok(task)
    }

    /// Deep copy of a task, or `None` if the id is unknown
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    /// Set the status of one file and recompute the task's aggregate status.
    ///
    /// The error message is stored only when `status` is [`FileStatus::Error`].
    /// Unknown task ids and out-of-range indices are ignored. Returns the task's
    /// aggregate status after the update, or `None` when nothing was changed.
    pub async fn update_file_status(
        &self,
        id: &TaskId,
        index: usize,
        status: FileStatus,
        error: Option<String>,
    ) -> Option<TaskStatus> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(id)?;
        let file = task.files.get_mut(index)?;

        file.status = status;
        file.error = if status == FileStatus::Error {
            Some(error.unwrap_or_else(|| "unknown error".to_string()))
        } else {
            None
        };
        task.refresh();
        Some(task.status)
    }

    /// Claim a job for a download attempt.
    ///
    /// If the referenced file exists and is not completed, marks it in-progress
    /// (clearing any previous error) and returns its URL. Stale jobs yield `None`.
    pub async fn begin_attempt(&self, job: &Job) -> Option<String> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&job.task_id)?;
        let file = task.files.get_mut(job.file_index)?;
        if file.status == FileStatus::Completed {
            return None;
        }

        file.status = FileStatus::InProgress;
        file.error = None;
        let url = file.url.clone();
        task.refresh();
        Some(url)
    }

    /// Record that jobs were queued for a freshly created task
    pub async fn mark_queued(&self, id: &TaskId) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(id)
            && task.status == TaskStatus::Pending
        {
            task.refresh();
        }
    }

    /// Deep copy of every task, keyed by id in sorted order
    pub async fn snapshot(&self) -> BTreeMap<TaskId, Task> {
        self.tasks
            .read()
            .await
            .iter()
            .map(|(id, task)| (id.clone(), task.clone()))
            .collect()
    }

    /// Load tasks recovered from a snapshot and return the jobs they still need.
    ///
    /// Every file that is not completed is reset to pending with its error cleared
    /// and gets a job. Tasks with unfinished files are forced to in-progress; fully
    /// completed tasks are stored unchanged. Jobs are ordered by task id, then by
    /// file index.
    pub async fn restore<I>(&self, recovered: I) -> Vec<Job>
    where
        I: IntoIterator<Item = Task>,
    {
        let now = Utc::now();
        let mut jobs = Vec::new();
        let mut tasks = self.tasks.write().await;

        let mut recovered: Vec<Task> = recovered.into_iter().collect();
        recovered.sort_by(|a, b| a.id.cmp(&b.id));

        for mut task in recovered {
            let mut requeued = 0usize;
            for (index, file) in task.files.iter_mut().enumerate() {
                if file.status != FileStatus::Completed {
                    file.status = FileStatus::Pending;
                    file.error = None;
                    jobs.push(Job::new(task.id.clone(), index));
                    requeued += 1;
                }
            }

            if requeued > 0 {
                task.status = TaskStatus::InProgress;
                task.updated_at = now;
                tracing::info!(
                    task_id = %task.id,
                    requeued,
                    total = task.files.len(),
                    "Re-queuing unfinished files from snapshot"
                );
            } else {
                tracing::debug!(task_id = %task.id, "Restored finished task");
            }

            tasks.insert(task.id.clone(), task);
        }

        jobs
    }

    /// Number of tracked tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the store holds no tasks
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
