//! Common test utilities for batch-dl integration tests

#![allow(dead_code)]

use batch_dl::{Config, Task, TaskId, TaskManager};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound for any single wait in these tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Config rooted in `dir` with a small pool and a long snapshot interval
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.worker_count = 4;
    config.download.queue_capacity = 16;
    config.persistence.snapshot_path = dir.join("tasks_snapshot.json");
    config.persistence.snapshot_interval = Duration::from_secs(3600);
    config.server.api.bind_address = "127.0.0.1:0".parse().expect("valid address");
    config
}

/// Fresh temp directory plus a config rooted in it
pub fn temp_config() -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path());
    (config, temp_dir)
}

/// Serve `body` at `route` with status 200
pub async fn mount_file(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Answer `route` with a bare status code
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Wait until the task reaches a terminal status
pub async fn wait_finished(manager: &TaskManager, id: &TaskId) -> Task {
    tokio::time::timeout(TEST_TIMEOUT, manager.wait_for_task(id))
        .await
        .expect("task did not finish in time")
        .expect("task lookup failed")
}

/// Where a file of a task lands on disk
pub fn downloaded_path(config: &Config, id: &TaskId, name: &str) -> PathBuf {
    config.download_dir().join(id.as_str()).join(name)
}
