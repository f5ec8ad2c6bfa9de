//! Single-file fetching with atomic publication.
//!
//! A [`Fetcher`] downloads one URL to one destination path. The production
//! implementation, [`HttpFetcher`], streams the response body into a sibling
//! `.part` file private to the attempt, syncs it to disk and renames it over the
//! destination, so a reader never sees a half-written file at the final path.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, FetchError, Result};
use crate::utils::partial_path;

/// Connect timeout for outgoing requests; transfers themselves are bounded only by cancellation
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over fetching one file, enabling testability.
///
/// Implementations must be safe to call concurrently, even for the same destination,
/// must abort promptly once `cancel` fires, and must not leave a file at `dest`
/// when they return an error.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` into `dest`
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), FetchError>;
}

/// Production [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("batch-dl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn transfer(
        &self,
        url: &str,
        dest: &Path,
        tmp: &Path,
        created: &mut bool,
    ) -> std::result::Result<(), FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let mut response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let file = tokio::fs::File::create(tmp)
            .await
            .map_err(|e| FetchError::io(tmp, e))?;
        *created = true;
        let mut writer = tokio::io::BufWriter::new(file);

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(tmp, e))?;
            written += chunk.len() as u64;
        }

        writer.flush().await.map_err(|e| FetchError::io(tmp, e))?;
        let file = writer.into_inner();
        file.sync_all().await.map_err(|e| FetchError::io(tmp, e))?;
        drop(file);

        tokio::fs::rename(tmp, dest)
            .await
            .map_err(|e| FetchError::io(dest, e))?;

        tracing::debug!(url, dest = %dest.display(), bytes = written, "File published");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), FetchError> {
        let tmp = partial_path(dest, rand::random());
        let mut created = false;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.transfer(url, dest, &tmp, &mut created) => result,
        };

        if result.is_err() && created {
            if let Err(e) = tokio::fs::remove_file(&tmp).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove partial file");
            }
        }

        result
    }
}
