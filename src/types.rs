//! Core types for batch-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a task
///
/// Ids are opaque strings. Freshly generated ids are 32 lowercase hex characters
/// (128 random bits), but ids loaded from a snapshot are accepted verbatim.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a TaskId from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random id
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();
        Self(hex)
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-file download status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FileStatus {
    /// Waiting for a worker
    #[default]
    #[serde(rename = "pending")]
    Pending,
    /// A worker is fetching the file
    #[serde(rename = "in-progress", alias = "in\u{2011}progress")]
    InProgress,
    /// File was fetched and published at its destination
    #[serde(rename = "completed")]
    Completed,
    /// The last attempt failed
    #[serde(rename = "error")]
    Error,
}

impl FileStatus {
    /// Whether no further attempt will be made in this process
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::InProgress => "in-progress",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate task status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    /// Registered, no jobs queued yet
    #[default]
    #[serde(rename = "pending")]
    Pending,
    /// At least one file still has work ahead of it
    #[serde(rename = "in-progress", alias = "in\u{2011}progress")]
    InProgress,
    /// Every file completed
    #[serde(rename = "completed")]
    Completed,
    /// Every file reached a terminal state and at least one failed
    #[serde(rename = "completed_with_errors")]
    CompletedWithErrors,
}

impl TaskStatus {
    /// Derive the aggregate status from the current file states.
    ///
    /// Any pending or in-progress file keeps the task in progress. Once every file
    /// is terminal the task is `Completed`, or `CompletedWithErrors` when at least
    /// one file ended in `Error`.
    pub fn derive(files: &[FileState]) -> Self {
        let mut any_error = false;
        for file in files {
            match file.status {
                FileStatus::Pending | FileStatus::InProgress => return TaskStatus::InProgress,
                FileStatus::Error => any_error = true,
                FileStatus::Completed => {}
            }
        }
        if any_error {
            TaskStatus::CompletedWithErrors
        } else {
            TaskStatus::Completed
        }
    }

    /// Whether the task has finished all of its work
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::CompletedWithErrors)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::CompletedWithErrors => "completed_with_errors",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download record for one URL of a task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileState {
    /// Source URL
    pub url: String,

    /// Current status
    pub status: FileStatus,

    /// Failure description, present only when `status` is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileState {
    /// A fresh pending record for `url`
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FileStatus::Pending,
            error: None,
        }
    }
}

/// A batch of URLs submitted together
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Per-file records, in submission order
    pub files: Vec<FileState>,

    /// Aggregate status derived from `files`
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When any part of the task last changed
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Number of files in `completed` state
    pub fn completed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .count()
    }

    /// Recompute `status` from the files and bump `updated_at`
    pub(crate) fn refresh(&mut self) {
        self.status = TaskStatus::derive(&self.files);
        self.updated_at = Utc::now();
    }
}

/// A queued download attempt for one file of one task
///
/// Jobs carry no state of their own; everything durable lives in the referenced
/// [`FileState`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Job {
    /// Owning task
    pub task_id: TaskId,
    /// Index into [`Task::files`]
    pub file_index: usize,
}

impl Job {
    /// Create a job
    pub fn new(task_id: TaskId, file_index: usize) -> Self {
        Self {
            task_id,
            file_index,
        }
    }
}

/// Status view of a task as returned by the API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Task identifier
    pub id: TaskId,

    /// Aggregate status
    pub status: TaskStatus,

    /// Number of completed files
    pub completed: usize,

    /// Total number of files
    pub total: usize,

    /// Per-file records
    pub files: Vec<FileState>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task last changed
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskInfo {
    fn from(task: Task) -> Self {
        Self {
            completed: task.completed_count(),
            total: task.files.len(),
            id: task.id,
            status: task.status,
            files: task.files,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Event emitted by the task manager
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task was registered
    TaskCreated {
        /// Task ID
        id: TaskId,
        /// Number of files in the task
        files: usize,
    },

    /// A worker started fetching a file
    FileStarted {
        /// Task ID
        id: TaskId,
        /// File index
        file_index: usize,
    },

    /// A file was fetched successfully
    FileCompleted {
        /// Task ID
        id: TaskId,
        /// File index
        file_index: usize,
    },

    /// A file attempt failed
    FileFailed {
        /// Task ID
        id: TaskId,
        /// File index
        file_index: usize,
        /// Failure description
        error: String,
    },

    /// Every file of a task reached a terminal state
    TaskFinished {
        /// Task ID
        id: TaskId,
        /// Final aggregate status
        status: TaskStatus,
    },

    /// A snapshot was written to disk
    SnapshotWritten {
        /// Number of tasks in the snapshot
        tasks: usize,
    },

    /// Manager is shutting down
    Shutdown,
}
