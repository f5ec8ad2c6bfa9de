//! Worker pool: pulls jobs off the queue and drives each file to a terminal state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::types::{Event, FileStatus, Job};
use crate::utils::{destination_path, task_dir};

use super::TaskManager;

/// Counts jobs a worker has taken off the queue and not yet finished
#[derive(Debug, Default)]
pub(crate) struct InFlightTracker {
    count: AtomicUsize,
    drained: Notify,
}

impl InFlightTracker {
    /// Register one in-flight job; it is released when the guard drops
    pub(crate) fn begin(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until no job is in flight
    pub(crate) async fn wait_idle(&self) {
        loop {
            // Registered before the check so a concurrent drop cannot be missed
            let drained = self.drained.notified();
            if self.count() == 0 {
                return;
            }
            drained.await;
        }
    }
}

/// Releases one in-flight slot on drop
pub(crate) struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.tracker.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.drained.notify_waiters();
        }
    }
}

impl TaskManager {
    /// Spawn `worker_count` worker loops
    ///
    /// Each loop waits for either cancellation or the next job, processes it to
    /// completion, and repeats. Jobs still queued when cancellation fires are left in
    /// place; their files stay pending and are recovered on the next start.
    pub(crate) fn start_workers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let worker_count = self.config.download.worker_count;
        tracing::info!(worker_count, "Starting download workers");

        (0..worker_count)
            .map(|worker_id| {
                let manager = self.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move { manager.run_worker(worker_id, cancel).await })
            })
            .collect()
    }

    async fn run_worker(self, worker_id: usize, cancel: CancellationToken) {
        tracing::debug!(worker_id, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = async { self.queue_state.job_rx.lock().await.recv().await } => job,
            };

            let Some(job) = next else {
                break;
            };

            // Counted before the re-check so shutdown either sees this job or we see the cancel
            let in_flight = self.queue_state.in_flight.begin();
            if cancel.is_cancelled() {
                tracing::debug!(
                    worker_id,
                    task_id = %job.task_id,
                    file_index = job.file_index,
                    "Leaving job for recovery"
                );
                break;
            }
            self.process_job(job, &cancel).await;
            drop(in_flight);
        }

        tracing::debug!(worker_id, "Worker stopped");
    }

    /// Run one download attempt for `job` and record its outcome
    pub(crate) async fn process_job(&self, job: Job, cancel: &CancellationToken) {
        let _in_flight = self.queue_state.in_flight.begin();

        let Some(url) = self.store.begin_attempt(&job).await else {
            tracing::debug!(
                task_id = %job.task_id,
                file_index = job.file_index,
                "Discarding stale job"
            );
            return;
        };

        self.emit_event(Event::FileStarted {
            id: job.task_id.clone(),
            file_index: job.file_index,
        });
        tracing::debug!(task_id = %job.task_id, file_index = job.file_index, url = %url, "Fetching file");

        let aggregate = match self.fetch_file(&job, &url, cancel).await {
            Ok(()) => {
                let aggregate = self
                    .store
                    .update_file_status(&job.task_id, job.file_index, FileStatus::Completed, None)
                    .await;
                tracing::info!(task_id = %job.task_id, file_index = job.file_index, "File completed");
                self.emit_event(Event::FileCompleted {
                    id: job.task_id.clone(),
                    file_index: job.file_index,
                });
                aggregate
            }
            Err(e) => {
                let message = e.to_string();
                let aggregate = self
                    .store
                    .update_file_status(
                        &job.task_id,
                        job.file_index,
                        FileStatus::Error,
                        Some(message.clone()),
                    )
                    .await;
                tracing::warn!(
                    task_id = %job.task_id,
                    file_index = job.file_index,
                    url = %url,
                    error = %message,
                    "File failed"
                );
                self.emit_event(Event::FileFailed {
                    id: job.task_id.clone(),
                    file_index: job.file_index,
                    error: message,
                });
                aggregate
            }
        };

        if let Some(status) = aggregate
            && status.is_terminal()
        {
            tracing::info!(task_id = %job.task_id, status = %status, "Task finished");
            self.emit_event(Event::TaskFinished {
                id: job.task_id.clone(),
                status,
            });
        }
    }

    async fn fetch_file(
        &self,
        job: &Job,
        url: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), FetchError> {
        let download_dir = self.config.download_dir();

        let dir = task_dir(download_dir, &job.task_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| FetchError::io(&dir, e))?;

        let dest = destination_path(download_dir, &job.task_id, url, job.file_index);
        self.fetcher.fetch(url, &dest, cancel).await
    }

    /// Number of jobs currently being processed
    pub fn in_flight_jobs(&self) -> usize {
        self.queue_state.in_flight.count()
    }
}
