//! # batch-dl
//!
//! Concurrent batch download service. A client submits a list of URLs as one
//! task; every URL becomes a job on a bounded queue drained by a fixed pool of
//! workers. Task state is snapshotted to disk periodically and on shutdown, and
//! unfinished files are re-queued on the next start.
//!
//! ## Quick Start
//!
//! ```no_run
//! use batch_dl::{Config, TaskManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TaskManager::new(Config::default())?;
//!     manager.start().await?;
//!
//!     // Subscribe to events
//!     let mut events = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task = manager
//!         .create_task(["https://example.com/a.iso", "https://example.com/b.iso"])
//!         .await?;
//!     let finished = manager.wait_for_task(&task.id).await?;
//!     println!("{} finished as {}", finished.id, finished.status);
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fetching a single URL to disk
pub mod fetch;
/// Task manager: queue, workers, lifecycle and recovery
pub mod manager;
/// Snapshot persistence
pub mod snapshot;
/// In-memory task store
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ApiConfig, Config, DownloadConfig, PersistenceConfig, ServerIntegrationConfig};
pub use error::{ApiError, Error, ErrorDetail, FetchError, Result, ToHttpStatus};
pub use fetch::{Fetcher, HttpFetcher};
pub use manager::TaskManager;
pub use snapshot::{SnapshotData, SnapshotPersister};
pub use store::TaskStore;
pub use types::{Event, FileState, FileStatus, Job, Task, TaskId, TaskInfo, TaskStatus};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use batch_dl::{Config, TaskManager, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = TaskManager::new(Config::default())?;
///     manager.start().await?;
///
///     // Run until SIGINT/SIGTERM, then drain and snapshot
///     run_with_shutdown(manager).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(manager: TaskManager) -> Result<()> {
    let cancel = manager.cancellation_token();
    tokio::select! {
        _ = wait_for_signal() => {}
        _ = cancel.cancelled() => {
            tracing::info!("Shutdown requested internally");
        }
    }
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
