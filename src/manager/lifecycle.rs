//! Startup and shutdown coordination.

use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::snapshot::SnapshotPersister;
use crate::types::Event;

use super::TaskManager;

impl TaskManager {
    /// Start background processing
    ///
    /// Startup sequence:
    /// 1. Creates the download directory
    /// 2. Restores tasks from the snapshot and queues their unfinished files
    /// 3. Spawns the worker pool (and a feeder for recovered jobs that did not fit)
    /// 4. Spawns the periodic snapshot loop
    ///
    /// # Errors
    ///
    /// Returns an error if the download directory cannot be created or the manager
    /// was already started.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Other("task manager already started".into()));
        }

        let download_dir = self.config.download_dir();
        tokio::fs::create_dir_all(download_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    download_dir.display(),
                    e
                ),
            ))
        })?;

        let backlog = self.recover_from_snapshot().await;

        let mut handles = self.start_workers();
        if !backlog.is_empty() {
            handles.push(self.spawn_backlog_feeder(backlog));
        }
        handles.push(self.start_snapshot_loop());

        self.background.lock().await.extend(handles);

        tracing::info!(
            download_dir = %download_dir.display(),
            snapshot = %self.config.snapshot_path().display(),
            "Task manager started"
        );
        Ok(())
    }

    fn start_snapshot_loop(&self) -> tokio::task::JoinHandle<()> {
        let persister = SnapshotPersister::new(
            self.store.clone(),
            self.config.snapshot_path().clone(),
            self.config.persistence.snapshot_interval,
            self.event_tx.clone(),
        );
        let cancel = self.cancel.clone();
        let in_flight = self.queue_state.in_flight.clone();

        tokio::spawn(async move {
            persister
                .run(cancel, async move { in_flight.wait_idle().await })
                .await
        })
    }

    /// Gracefully shut down the manager
    ///
    /// Shutdown sequence:
    /// 1. Stops accepting new tasks
    /// 2. Cancels the root token: workers stop taking jobs, in-flight transfers abort,
    ///    and the API server (if spawned) stops listening
    /// 3. Waits for every in-flight job to record its outcome
    /// 4. Waits for the background tasks, including the final snapshot write
    ///
    /// Jobs still in the queue are not run; their files remain pending in the final
    /// snapshot and are retried on the next start.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.queue_state
            .accepting_new
            .store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        self.cancel.cancel();

        let in_flight = self.in_flight_jobs();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for in-flight jobs to finish");
        }
        self.queue_state.in_flight.wait_idle().await;
        tracing::info!("All in-flight jobs finished");

        let handles = std::mem::take(&mut *self.background.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Background task ended abnormally");
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
