//! Error types for batch-dl
//!
//! This module provides:
//! - The crate-wide [`Error`] used by task management, persistence and the API
//! - [`FetchError`], the per-file transfer failure recorded on a file's state
//! - HTTP status code mapping and structured JSON error bodies for the API

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for batch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for batch-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker_count")
        key: Option<String>,
    },

    /// Rejected input (e.g. a URL batch that is empty after trimming)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Task not found
    #[error("task not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot could not be written or read
    #[error("snapshot error at {path}: {reason}")]
    Snapshot {
        /// Snapshot file involved
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failure of a single file transfer
///
/// The `Display` text of this error is what ends up in [`crate::types::FileState::error`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or is not fetchable
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Transport-level failure (DNS, connect, TLS, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("unexpected HTTP status: {status}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
    },

    /// Local filesystem failure while writing or publishing the file
    #[error("filesystem error at {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Transfer aborted by the shutdown signal
    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Structured JSON error body returned by the API
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "task not found: 3f9c...",
///     "details": { "task_id": "3f9c..." }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_input")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Snapshot { .. } => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Snapshot { .. } => "snapshot_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Snapshot { path, .. } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "must be positive".into(),
                    key: Some("worker_count".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::InvalidInput("no URLs".into()),
                400,
                "invalid_input",
            ),
            (Error::NotFound("abc".into()), 404, "not_found"),
            (Error::ShuttingDown, 503, "shutting_down"),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::Serialization(serde_json::from_str::<u8>("x").unwrap_err()),
                500,
                "serialization_error",
            ),
            (
                Error::Snapshot {
                    path: PathBuf::from("tasks_snapshot.json"),
                    reason: "rename failed".into(),
                },
                500,
                "snapshot_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("misc".into()), 500, "internal_error"),
        ]
    }

    #[test]
    fn every_variant_maps_to_status_and_code() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "{error:?}");
            assert_eq!(error.error_code(), code, "{error:?}");
        }
    }

    #[test]
    fn not_found_carries_task_id_detail() {
        let api: ApiError = Error::NotFound("t-1".into()).into();
        assert_eq!(api.error.code, "not_found");
        assert_eq!(api.error.details, Some(serde_json::json!({"task_id": "t-1"})));
    }

    #[test]
    fn invalid_input_has_no_details() {
        let api: ApiError = Error::InvalidInput("empty".into()).into();
        assert_eq!(api.error.code, "invalid_input");
        assert_eq!(api.error.message, "invalid input: empty");
        let json = serde_json::to_value(&api).unwrap();
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn fetch_error_messages_are_descriptive() {
        assert_eq!(
            FetchError::HttpStatus { status: 404 }.to_string(),
            "unexpected HTTP status: 404"
        );
        assert_eq!(FetchError::Cancelled.to_string(), "download cancelled");
        let io = FetchError::io(
            "/tmp/x.part",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(io.to_string(), "filesystem error at /tmp/x.part: denied");
    }
}
