//! Crash-safe task snapshots.
//!
//! Snapshots are a pretty-printed JSON object mapping task id to task record. They
//! are written to `<path>.tmp`, synced, and renamed over `<path>`, so the snapshot
//! file is always either the previous complete version or the new complete version.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::types::{Event, Task, TaskId};

/// Serialized form of the whole store
pub type SnapshotData = BTreeMap<TaskId, Task>;

/// Temporary path a snapshot is staged at before the atomic rename
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Atomically replace the snapshot at `path` with `tasks`
pub async fn write_snapshot(path: &Path, tasks: &SnapshotData) -> Result<()> {
    let data = serde_json::to_vec_pretty(tasks)?;

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| snapshot_error(path, "create directory", e))?;
    }

    let tmp = staging_path(path);
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| snapshot_error(path, "create temp file", e))?;
    file.write_all(&data)
        .await
        .map_err(|e| snapshot_error(path, "write", e))?;
    file.sync_all()
        .await
        .map_err(|e| snapshot_error(path, "sync", e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| snapshot_error(path, "rename", e))?;

    Ok(())
}

/// Read the snapshot at `path`.
///
/// Returns `Ok(None)` when no snapshot exists (a fresh start).
pub async fn load_snapshot(path: &Path) -> Result<Option<SnapshotData>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(snapshot_error(path, "read", e)),
    };

    let tasks: SnapshotData = serde_json::from_slice(&raw).map_err(|e| Error::Snapshot {
        path: path.to_path_buf(),
        reason: format!("decode: {}", e),
    })?;
    Ok(Some(tasks))
}

fn snapshot_error(path: &Path, action: &str, e: std::io::Error) -> Error {
    Error::Snapshot {
        path: path.to_path_buf(),
        reason: format!("{}: {}", action, e),
    }
}

/// Periodically persists a [`TaskStore`] to disk
#[derive(Clone)]
pub struct SnapshotPersister {
    store: Arc<TaskStore>,
    path: PathBuf,
    interval: Duration,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl SnapshotPersister {
    /// Create a persister for `store` writing to `path` every `interval`
    pub fn new(
        store: Arc<TaskStore>,
        path: PathBuf,
        interval: Duration,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Self {
        Self {
            store,
            path,
            interval,
            event_tx,
        }
    }

    /// Take a copy of the store and write it out once
    ///
    /// The store's lock is held only while copying, never across I/O.
    pub async fn persist_once(&self) -> Result<usize> {
        let tasks = self.store.snapshot().await;
        write_snapshot(&self.path, &tasks).await?;
        self.event_tx
            .send(Event::SnapshotWritten { tasks: tasks.len() })
            .ok();
        Ok(tasks.len())
    }

    /// Persist on every tick until `cancel` fires, then persist one final time.
    ///
    /// The final write waits for `drained` so it captures the outcome of work that
    /// was still in flight at cancellation. Failures are logged and retried on the
    /// next tick.
    pub async fn run<F>(self, cancel: CancellationToken, drained: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.persist_once().await {
                        Ok(count) => tracing::debug!(tasks = count, path = %self.path.display(), "Snapshot written"),
                        Err(e) => tracing::error!(error = %e, "Periodic snapshot failed"),
                    }
                }
            }
        }

        drained.await;
        match self.persist_once().await {
            Ok(count) => tracing::info!(tasks = count, path = %self.path.display(), "Final snapshot written"),
            Err(e) => tracing::error!(error = %e, "Final snapshot failed, latest state not persisted"),
        }
    }
}
