//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Task submission and status
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

use crate::types::{TaskId, TaskStatus};

mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` continues to work
pub use system::*;
pub use tasks::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateTaskRequest {
    /// URLs to download; blank entries are ignored
    pub urls: Vec<String>,
}

/// Response body for POST /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateTaskResponse {
    /// Identifier to poll with GET /tasks/{id}
    pub task_id: TaskId,
    /// Aggregate status at the time of the response
    pub status: TaskStatus,
}
