//! Bounded job queue.
//!
//! The queue is a `tokio::sync::mpsc` channel of fixed capacity. Producers wait
//! while it is full, which is how backpressure reaches `create_task` callers.

use tokio::sync::mpsc::error::TrySendError;

use crate::error::{Error, Result};
use crate::types::Job;

use super::TaskManager;

impl TaskManager {
    /// Push a job, waiting for space while the queue is full
    ///
    /// Gives up with [`Error::ShuttingDown`] once the manager is cancelled.
    pub(crate) async fn enqueue(&self, job: Job) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::ShuttingDown),
            sent = self.queue_state.job_tx.send(job) => sent.map_err(|_| Error::ShuttingDown),
        }
    }

    /// Push a job without waiting, handing it back when the queue is full
    pub(crate) fn try_enqueue(&self, job: Job) -> std::result::Result<(), Job> {
        match self.queue_state.job_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) | Err(TrySendError::Closed(job)) => Err(job),
        }
    }

    /// Number of jobs waiting in the queue
    pub fn queued_jobs(&self) -> usize {
        self.queue_state.job_tx.max_capacity() - self.queue_state.job_tx.capacity()
    }

    /// Feed jobs that did not fit in the queue at startup, waiting for space as needed
    pub(crate) fn spawn_backlog_feeder(&self, backlog: Vec<Job>) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let total = backlog.len();
            for (fed, job) in backlog.into_iter().enumerate() {
                if manager.enqueue(job).await.is_err() {
                    tracing::info!(
                        fed,
                        remaining = total - fed,
                        "Backlog feeding stopped by shutdown; remaining files stay pending"
                    );
                    return;
                }
            }
            tracing::debug!(jobs = total, "Recovery backlog fully queued");
        })
    }
}
