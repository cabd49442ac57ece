//! Remote task status types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::payload::PayloadNode;

/// Status tag reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Accepted but not yet started.
    Pending,
    /// Work in progress.
    #[default]
    Running,
    /// Finished successfully; a result payload is available.
    Completed,
    /// Finished unsuccessfully.
    Failed,
}

impl TaskState {
    /// Maps a wire status tag to a state.
    ///
    /// Unrecognized or absent tags map to `Running` so a poll loop keeps
    /// progressing instead of erroring on vocabulary it does not know.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("pending") => TaskState::Pending,
            Some("completed") => TaskState::Completed,
            Some("failed") => TaskState::Failed,
            _ => TaskState::Running,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One observation of a remote task.
///
/// The result payload only exists on `Completed`, which the enum shape
/// enforces.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    /// Accepted, not started.
    Pending {
        /// Progress percentage (0-100) if reported.
        progress: Option<u8>,
    },
    /// In progress.
    Running {
        /// Progress percentage (0-100) if reported.
        progress: Option<u8>,
    },
    /// Finished with a result payload.
    Completed {
        /// The raw result body.
        payload: PayloadNode,
    },
    /// Finished unsuccessfully.
    Failed {
        /// Reason reported by the remote, if any.
        reason: Option<String>,
    },
}

impl TaskStatus {
    /// Builds a non-terminal or failed status from a state tag.
    ///
    /// `Completed` needs a payload, so callers with a completed state should
    /// construct `TaskStatus::Completed` directly; passing it here yields an
    /// empty payload.
    pub fn from_state(state: TaskState, progress: Option<u8>) -> Self {
        match state {
            TaskState::Pending => TaskStatus::Pending { progress },
            TaskState::Running => TaskStatus::Running { progress },
            TaskState::Completed => TaskStatus::Completed {
                payload: PayloadNode::empty(),
            },
            TaskState::Failed => TaskStatus::Failed { reason: None },
        }
    }

    /// Returns the state tag of this status.
    pub fn state(&self) -> TaskState {
        match self {
            TaskStatus::Pending { .. } => TaskState::Pending,
            TaskStatus::Running { .. } => TaskState::Running,
            TaskStatus::Completed { .. } => TaskState::Completed,
            TaskStatus::Failed { .. } => TaskState::Failed,
        }
    }

    /// Returns the progress percentage, if any.
    pub fn progress(&self) -> Option<u8> {
        match self {
            TaskStatus::Pending { progress } | TaskStatus::Running { progress } => *progress,
            TaskStatus::Completed { .. } => Some(100),
            TaskStatus::Failed { .. } => None,
        }
    }

    /// Clamps a raw numeric progress value into 0-100.
    pub fn clamp_progress(raw: f64) -> Option<u8> {
        if raw.is_nan() {
            return None;
        }
        Some(raw.clamp(0.0, 100.0).round() as u8)
    }
}
