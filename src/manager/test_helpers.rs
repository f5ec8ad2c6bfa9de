//! Shared test helpers for creating TaskManager instances in tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::manager::TaskManager;

/// How long helpers wait for asynchronous progress before failing a test
pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// In-memory [`Fetcher`] with per-URL outcomes.
///
/// Successful fetches write the URL itself as the file body.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    failures: HashMap<String, u16>,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with an HTTP error status
    pub(crate) fn failing(mut self, url: &str, status: u16) -> Self {
        self.failures.insert(url.to_string(), status);
        self
    }

    /// Hold every fetch until a permit is added to the returned semaphore
    ///
    /// A held fetch aborts with [`FetchError::Cancelled`] on cancellation.
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Sleep before finishing, ignoring cancellation
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs fetched so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `n` fetches have started
    pub(crate) async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(TEST_TIMEOUT, async {
            while self.calls.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {n} fetches, saw {:?}", self.calls()));
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                permit = gate.acquire() => permit.map_err(|_| FetchError::Cancelled)?.forget(),
            }
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(&status) = self.failures.get(url) {
            return Err(FetchError::HttpStatus { status });
        }

        tokio::fs::write(dest, url.as_bytes())
            .await
            .map_err(|e| FetchError::io(dest, e))
    }
}

/// Config rooted in `dir`: 3 workers, queue of 10, snapshots only at shutdown
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.worker_count = 3;
    config.download.queue_capacity = 10;
    config.persistence.snapshot_path = dir.join("snapshot.json");
    config.persistence.snapshot_interval = Duration::from_secs(3600);
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    config
}

/// Helper to create an unstarted TaskManager backed by `fetcher`.
/// Returns the manager and the tempdir (which must be kept alive).
pub(crate) fn create_test_manager(
    fetcher: Arc<ScriptedFetcher>,
) -> (TaskManager, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let manager = TaskManager::with_fetcher(test_config(temp_dir.path()), fetcher).unwrap();
    (manager, temp_dir)
}
