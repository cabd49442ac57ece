//! Error types for the runtime crate.

use std::time::Duration;

use presale_models::TaskHandle;
use thiserror::Error;

/// Errors that end (or prevent) a task run.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network-level failure talking to the task API.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered but refused the request or left out the task id.
    #[error("remote rejected the request: {0}")]
    RemoteRejection(String),

    /// The remote reported the task as failed.
    #[error("task {task} failed: {}", .reason.as_deref().unwrap_or("no reason given"))]
    RemoteFailure {
        /// The failed task.
        task: TaskHandle,
        /// Reason reported by the remote.
        reason: Option<String>,
    },

    /// The overall wait budget ran out while the task was still running.
    #[error("task {task} still unfinished after {}s", .elapsed.as_secs())]
    DeadlineExceeded {
        /// The abandoned task.
        task: TaskHandle,
        /// How long the poller waited.
        elapsed: Duration,
    },

    /// The caller asked to stop the run.
    #[error("run cancelled{}", .task.as_ref().map(|t| format!(" (task {})", t)).unwrap_or_default())]
    Cancelled {
        /// The abandoned task, if one had been created.
        task: Option<TaskHandle>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// A short, non-technical message suitable for end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            RelayError::RemoteRejection(_) | RelayError::Configuration(_) => {
                "Could not start the task. Please try again later."
            }
            RelayError::RemoteFailure { .. } => "The task failed. Please try again later.",
            RelayError::DeadlineExceeded { .. } => {
                "The task timed out. Please try again later."
            }
            RelayError::Cancelled { .. } => "The task was cancelled.",
            RelayError::Transport(_) | RelayError::Io(_) | RelayError::Json(_) => {
                "Something went wrong while talking to the service. Please try again later."
            }
        }
    }

    /// Returns true for the outcomes that abort a task run.
    pub fn is_task_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::RemoteRejection(_)
                | RelayError::RemoteFailure { .. }
                | RelayError::DeadlineExceeded { .. }
                | RelayError::Cancelled { .. }
        )
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Why a single download attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The file host answered with something other than 200.
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// Connection, DNS or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The attempt exceeded its time bound.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The bytes could not be written locally.
    #[error("write failed: {0}")]
    Write(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}
