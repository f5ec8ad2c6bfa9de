//! Restoring unfinished work from the last snapshot.

use crate::snapshot::load_snapshot;
use crate::types::Job;

use super::TaskManager;

impl TaskManager {
    /// Load the snapshot, restore its tasks and queue every unfinished file.
    ///
    /// A missing snapshot is a fresh start. An unreadable or corrupt snapshot is
    /// logged and treated as no prior state. Jobs are pushed without waiting; any
    /// that do not fit in the queue are returned as a backlog for
    /// `spawn_backlog_feeder` once workers are consuming.
    pub(crate) async fn recover_from_snapshot(&self) -> Vec<Job> {
        let path = self.config.snapshot_path();

        let recovered = match load_snapshot(path).await {
            Ok(Some(tasks)) => tasks,
            Ok(None) => {
                tracing::info!(path = %path.display(), "No snapshot found, starting fresh");
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load snapshot, starting with empty state");
                return Vec::new();
            }
        };

        let task_count = recovered.len();
        for (key, task) in &recovered {
            if *key != task.id {
                tracing::warn!(
                    key = %key,
                    task_id = %task.id,
                    "Snapshot key does not match task id, using the task id"
                );
            }
        }

        let jobs = self.store.restore(recovered.into_values()).await;
        let job_count = jobs.len();

        let mut backlog = Vec::new();
        for job in jobs {
            // Once one job overflows, the rest follow it so queue order is kept
            if !backlog.is_empty() {
                backlog.push(job);
            } else if let Err(job) = self.try_enqueue(job) {
                backlog.push(job);
            }
        }

        tracing::info!(
            tasks = task_count,
            jobs = job_count,
            backlog = backlog.len(),
            "Recovered state from snapshot"
        );

        backlog
    }
}
