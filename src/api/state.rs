//! Application state for the API server

use crate::TaskManager;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The task manager handling submissions and lookups
    pub manager: Arc<TaskManager>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<TaskManager>) -> Self {
        Self { manager }
    }
}
