//! batch-dl service binary
//!
//! Usage: `batch-dl [config.json]`

use batch_dl::{Config, Error, Result, TaskManager, api, run_with_shutdown};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batch_dl=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;

    // Bind before anything else so a taken port fails fast
    let listener = TcpListener::bind(config.server.api.bind_address)
        .await
        .map_err(|e| {
            tracing::error!(
                address = %config.server.api.bind_address,
                error = %e,
                "Failed to bind API address"
            );
            Error::Io(e)
        })?;

    let manager = Arc::new(TaskManager::new(config)?);
    manager.start().await?;

    let server = tokio::spawn({
        let manager = manager.clone();
        async move {
            let result = api::serve(listener, manager.clone(), manager.get_config()).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "API server failed, shutting down");
                manager.cancellation_token().cancel();
            }
            result
        }
    });

    run_with_shutdown((*manager).clone()).await?;

    server
        .await
        .map_err(|e| Error::ApiServerError(e.to_string()))?
}

/// Config from the optional first argument, with directory overrides from the environment
fn load_config() -> Result<Config> {
    let mut config = match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            tracing::info!(path = %path.display(), "Loading configuration");
            Config::from_file(&path)?
        }
        None => Config::default(),
    };

    if let Some(dir) = std::env::var_os("BATCH_DL_DOWNLOAD_DIR") {
        config.download.download_dir = PathBuf::from(dir);
    }
    if let Some(path) = std::env::var_os("BATCH_DL_SNAPSHOT") {
        config.persistence.snapshot_path = PathBuf::from(path);
    }

    config.validate()?;
    tracing::debug!(?config, "Effective configuration");
    Ok(config)
}
