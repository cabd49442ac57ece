//! Task events and observers.
//!
//! The coordinator and poller report what they are doing through a
//! [`TaskObserver`]. Observers are told, never asked: a failing or
//! panicking observer is logged and otherwise ignored.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use presale_models::{CompletionReport, TaskHandle, TaskState};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::FetchError;

/// Events emitted during a task run.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// The remote accepted the task.
    TaskCreated {
        /// Handle issued by the remote.
        task: TaskHandle,
    },
    /// The remote status tag changed.
    StatusChanged {
        /// The task.
        task: TaskHandle,
        /// Previous tag (`None` on the first observation).
        from: Option<TaskState>,
        /// New tag.
        to: TaskState,
    },
    /// The remote reported a new progress percentage.
    Progress {
        /// The task.
        task: TaskHandle,
        /// Percentage, 0-100.
        percent: u8,
        /// Time spent polling so far.
        elapsed: Duration,
    },
    /// A status check failed; polling continues.
    PollError {
        /// The task.
        task: TaskHandle,
        /// What went wrong.
        error: String,
    },
    /// The remote reported completion.
    Completed {
        /// The task.
        task: TaskHandle,
        /// Time spent polling.
        elapsed: Duration,
    },
    /// The remote reported failure.
    Failed {
        /// The task.
        task: TaskHandle,
        /// Reason given by the remote.
        reason: Option<String>,
    },
    /// The poll loop ran out of time.
    TimedOut {
        /// The task.
        task: TaskHandle,
        /// Time spent polling.
        elapsed: Duration,
    },
    /// The caller stopped the wait.
    Cancelled {
        /// The task.
        task: TaskHandle,
    },
    /// File references were found in the result payload.
    ReferencesFound {
        /// The task.
        task: TaskHandle,
        /// How many.
        count: usize,
    },
    /// A download is starting.
    DownloadStarted {
        /// Remote file name.
        name: String,
        /// 1-based position in the download list.
        index: usize,
        /// Length of the download list.
        total: usize,
    },
    /// A download attempt failed and will be retried.
    DownloadRetrying {
        /// Remote file name.
        name: String,
        /// The attempt that failed (1-based).
        attempt: u32,
        /// Wait before the next attempt.
        delay: Duration,
        /// Why the attempt failed.
        error: FetchError,
    },
    /// A file landed on disk.
    DownloadFinished {
        /// Remote file name.
        name: String,
        /// Local path.
        path: PathBuf,
        /// Attempts it took.
        attempts: u32,
    },
    /// A file could not be retrieved within the attempt budget.
    DownloadExhausted {
        /// Remote file name.
        name: String,
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        error: FetchError,
    },
    /// Retrieved names were compared against the expected manifest.
    Reconciled {
        /// The task.
        task: TaskHandle,
        /// The comparison result.
        report: CompletionReport,
    },
}

impl TaskEvent {
    /// Returns true for events that end the poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::Completed { .. }
                | TaskEvent::Failed { .. }
                | TaskEvent::TimedOut { .. }
                | TaskEvent::Cancelled { .. }
        )
    }
}

/// Result returned by observers.
pub type ObserverResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives task events.
pub trait TaskObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &TaskEvent) -> ObserverResult;
}

/// Delivers an event, logging (and otherwise ignoring) observer failures.
pub(crate) fn notify(observer: &dyn TaskObserver, event: TaskEvent) {
    match catch_unwind(AssertUnwindSafe(|| observer.on_event(&event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, event = ?event, "observer failed to handle event"),
        Err(_) => warn!(event = ?event, "observer panicked while handling event"),
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TaskObserver for NoopObserver {
    fn on_event(&self, _event: &TaskEvent) -> ObserverResult {
        Ok(())
    }
}

/// Observer that writes events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TaskObserver for LogObserver {
    fn on_event(&self, event: &TaskEvent) -> ObserverResult {
        match event {
            TaskEvent::PollError { task, error } => {
                warn!(task_id = %task, error = %error, "status check failed")
            }
            TaskEvent::DownloadRetrying { name, attempt, error, .. } => {
                warn!(file = %name, attempt, error = %error, "download attempt failed")
            }
            TaskEvent::DownloadExhausted { name, attempts, error } => {
                warn!(file = %name, attempts, error = %error, "download gave up")
            }
            other => info!(event = ?other, "task event"),
        }
        Ok(())
    }
}

/// Observer that forwards events into a channel.
///
/// Sending fails once the receiver is gone; that failure is reported like
/// any other observer error and does not affect the run.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TaskObserver for ChannelObserver {
    fn on_event(&self, event: &TaskEvent) -> ObserverResult {
        self.tx.send(event.clone())?;
        Ok(())
    }
}
