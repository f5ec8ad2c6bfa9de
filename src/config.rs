//! Configuration types for batch-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Download behavior configuration (directories, worker pool, queue)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory for downloaded files; each task gets a subdirectory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Number of concurrent download workers (default: 5)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Capacity of the job queue; producers block when it is full (default: 100)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Snapshot persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot file path (default: "./tasks_snapshot.json")
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Interval between periodic snapshots, in seconds (default: 15)
    #[serde(default = "default_snapshot_interval", with = "duration_serde")]
    pub snapshot_interval: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            snapshot_interval: default_snapshot_interval(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for [`crate::TaskManager`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download directories, worker pool and queue settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Snapshot location and cadence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.worker_count == 0 {
            return Err(Error::Config {
                message: "worker_count must be at least 1".into(),
                key: Some("worker_count".into()),
            });
        }
        if self.download.queue_capacity == 0 {
            return Err(Error::Config {
                message: "queue_capacity must be at least 1".into(),
                key: Some("queue_capacity".into()),
            });
        }
        if self.persistence.snapshot_interval.is_zero() {
            return Err(Error::Config {
                message: "snapshot_interval must be non-zero".into(),
                key: Some("snapshot_interval".into()),
            });
        }
        Ok(())
    }

    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Snapshot file path
    pub fn snapshot_path(&self) -> &PathBuf {
        &self.persistence.snapshot_path
    }
}

// Default value functions
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_worker_count() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    100
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("tasks_snapshot.json")
}

fn default_snapshot_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
