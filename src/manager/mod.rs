//! Task manager split into focused submodules.
//!
//! The `TaskManager` struct and its methods are organized by concern:
//! - [`queue`] - Bounded job queue and backpressure
//! - [`worker`] - Worker pool and per-job processing
//! - [`recovery`] - Restoring unfinished work from the last snapshot
//! - [`lifecycle`] - Startup and shutdown coordination

mod lifecycle;
mod queue;
mod recovery;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub(crate) use worker::InFlightTracker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::store::TaskStore;
use crate::types::{Event, Job, Task, TaskId, TaskInfo};
use crate::utils::colliding_file_names;

/// Queue and worker bookkeeping
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Producer side of the bounded job queue
    pub(crate) job_tx: tokio::sync::mpsc::Sender<Job>,
    /// Consumer side, shared by every worker
    pub(crate) job_rx: Arc<tokio::sync::Mutex<tokio::sync::mpsc::Receiver<Job>>>,
    /// Set to false once shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Jobs currently being processed by a worker
    pub(crate) in_flight: Arc<InFlightTracker>,
}

/// Main task manager instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TaskManager {
    /// Authoritative task state
    pub(crate) store: Arc<TaskStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Downloader used by workers
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Queue and worker bookkeeping
    pub(crate) queue_state: QueueState,
    /// Root cancellation token shared by workers, the snapshot loop and the API server
    pub(crate) cancel: CancellationToken,
    /// Background tasks spawned by `start`, awaited by `shutdown`
    pub(crate) background: Arc<tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>>,
    /// Guards against starting twice
    pub(crate) started: Arc<AtomicBool>,
}

impl TaskManager {
    /// Create a manager that downloads over HTTP
    ///
    /// Nothing runs until [`TaskManager::start`] is called.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new()?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a manager with a custom [`Fetcher`]
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let (job_tx, job_rx) = tokio::sync::mpsc::channel(config.download.queue_capacity);

        let queue_state = QueueState {
            job_tx,
            job_rx: Arc::new(tokio::sync::Mutex::new(job_rx)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            in_flight: Arc::new(InFlightTracker::default()),
        };

        Ok(Self {
            store: Arc::new(TaskStore::new()),
            event_tx,
            config: Arc::new(config),
            fetcher,
            queue_state,
            cancel: CancellationToken::new(),
            background: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            started: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Subscribe to manager events
    ///
    /// Each subscriber receives every event independently. A subscriber that falls
    /// more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The underlying task store
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Token cancelled when shutdown begins
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether new tasks are still accepted
    pub fn is_accepting(&self) -> bool {
        self.queue_state.accepting_new.load(Ordering::SeqCst)
    }

    /// Submit a batch of URLs as a new task.
    ///
    /// Registers the task, then enqueues one job per file. Enqueueing waits while the
    /// queue is full, so this call can block under load. Returns the task as it stands
    /// once every job is queued.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if no URL remains after trimming
    /// - [`Error::ShuttingDown`] if shutdown has begun, either before the task was
    ///   registered or while its jobs were being queued. Files that were not queued
    ///   stay pending and are picked up by recovery on the next start.
    pub async fn create_task<I, S>(&self, urls: I) -> Result<Task>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let task = self.store.create(urls).await?;
        tracing::info!(task_id = %task.id, files = task.files.len(), "Task created");

        let urls: Vec<&str> = task.files.iter().map(|f| f.url.as_str()).collect();
        let colliding = colliding_file_names(&urls);
        if !colliding.is_empty() {
            tracing::warn!(
                task_id = %task.id,
                names = ?colliding,
                "Several URLs map to the same file name, only one copy will be kept"
            );
        }

        self.emit_event(Event::TaskCreated {
            id: task.id.clone(),
            files: task.files.len(),
        });

        for file_index in 0..task.files.len() {
            self.enqueue(Job::new(task.id.clone(), file_index)).await?;
        }
        self.store.mark_queued(&task.id).await;

        self.store
            .get(&task.id)
            .await
            .ok_or_else(|| Error::NotFound(task.id.to_string()))
    }

    /// Deep copy of a task, or `None` if the id is unknown
    pub async fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.store.get(id).await
    }

    /// Status view of a task
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub async fn task_info(&self, id: &TaskId) -> Result<TaskInfo> {
        self.store
            .get(id)
            .await
            .map(TaskInfo::from)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Wait until a task reaches `completed` or `completed_with_errors`
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub async fn wait_for_task(&self, id: &TaskId) -> Result<Task> {
        // Subscribe before the first check so no transition is missed
        let mut events = self.subscribe();
        loop {
            let task = self
                .store
                .get(id)
                .await
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            if task.status.is_terminal() {
                return Ok(task);
            }

            match events.recv().await {
                Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    return Err(Error::ShuttingDown);
                }
            }
        }
    }

    /// Emit an event to all subscribers
    ///
    /// Sends with no active subscribers are silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
