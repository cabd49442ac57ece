//! Task completion poller.
//!
//! Drives `Polling -> {Completed | Failed | TimedOut | Cancelled}` for one
//! task. Each tick first checks the wall-clock deadline, then asks the
//! remote for the task's status, then sleeps for the polling interval
//! (clamped so it never sleeps past the deadline). A status call still in
//! flight when the deadline passes is abandoned.
//!
//! Status-check errors are logged and surfaced as events but never end the
//! loop; only a remote-reported failure, the deadline, or an explicit
//! shutdown signal do.

use std::time::Duration;

use presale_models::{PayloadNode, TaskHandle, TaskState, TaskStatus};
use tokio::sync::watch;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::client::TaskApi;
use crate::config::RuntimeConfig;
use crate::event::{notify, TaskEvent, TaskObserver};

/// Terminal result of polling a task.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The remote reported completion.
    Completed {
        /// The result body.
        payload: PayloadNode,
        /// Status calls made.
        polls: u32,
        /// Time spent polling.
        elapsed: Duration,
    },
    /// The remote reported failure.
    Failed {
        /// Reason reported by the remote.
        reason: Option<String>,
        /// Status calls made.
        polls: u32,
    },
    /// The deadline passed first.
    TimedOut {
        /// Time spent polling.
        elapsed: Duration,
        /// Status calls made (including an abandoned one).
        polls: u32,
    },
    /// The shutdown signal fired.
    Cancelled {
        /// Status calls made.
        polls: u32,
    },
}

impl PollOutcome {
    /// Number of status calls made.
    pub fn polls(&self) -> u32 {
        match self {
            PollOutcome::Completed { polls, .. }
            | PollOutcome::Failed { polls, .. }
            | PollOutcome::TimedOut { polls, .. }
            | PollOutcome::Cancelled { polls } => *polls,
        }
    }
}

/// Poller state between ticks.
enum PollState {
    Polling,
    Done(PollOutcome),
}

/// What the poller has seen so far, used to report only changes.
#[derive(Default)]
struct Observed {
    state: Option<TaskState>,
    progress: Option<u8>,
    polls: u32,
}

/// Polls one task until it reaches a terminal state.
pub struct TaskPoller<'a, A: ?Sized> {
    api: &'a A,
    poll_interval: Duration,
    timeout: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<'a, A: TaskApi + ?Sized> TaskPoller<'a, A> {
    /// Creates a poller using the interval and timeout from `config`.
    pub fn new(api: &'a A, config: &RuntimeConfig) -> Self {
        Self {
            api,
            poll_interval: config.poll_interval,
            timeout: config.task_timeout,
            shutdown: None,
        }
    }

    /// Stops waiting (with `Cancelled`) once `shutdown` reads `true`.
    ///
    /// The remote task is left running.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Polls `task` until completion, failure, timeout or shutdown.
    pub async fn wait(&mut self, task: &TaskHandle, observer: &dyn TaskObserver) -> PollOutcome {
        let started = Instant::now();
        let deadline = deadline_after(started, self.timeout);
        let mut observed = Observed::default();

        debug!(
            task_id = %task,
            poll_interval_ms = self.poll_interval.as_millis(),
            timeout_s = self.timeout.as_secs(),
            "starting task poller"
        );

        let outcome = loop {
            match self.tick(task, started, deadline, &mut observed, observer).await {
                PollState::Polling => continue,
                PollState::Done(outcome) => break outcome,
            }
        };

        self.report(task, &outcome, observer);
        outcome
    }

    async fn tick(
        &mut self,
        task: &TaskHandle,
        started: Instant,
        deadline: Instant,
        observed: &mut Observed,
        observer: &dyn TaskObserver,
    ) -> PollState {
        let elapsed = started.elapsed();
        if elapsed >= self.timeout {
            return PollState::Done(PollOutcome::TimedOut {
                elapsed,
                polls: observed.polls,
            });
        }

        let api = self.api;
        observed.polls += 1;

        let result = tokio::select! {
            biased;
            _ = shutdown_requested(&mut self.shutdown) => {
                return PollState::Done(PollOutcome::Cancelled { polls: observed.polls });
            }
            result = timeout_at(deadline, api.get_task_status(task)) => result,
        };

        match result {
            Err(_) => {
                return PollState::Done(PollOutcome::TimedOut {
                    elapsed: started.elapsed(),
                    polls: observed.polls,
                });
            }
            Ok(Err(e)) => {
                warn!(task_id = %task, error = %e, "error polling task");
                notify(
                    observer,
                    TaskEvent::PollError {
                        task: task.clone(),
                        error: e.to_string(),
                    },
                );
            }
            Ok(Ok(status)) => {
                self.observe(task, &status, started, observed, observer);
                match status {
                    TaskStatus::Completed { payload } => {
                        return PollState::Done(PollOutcome::Completed {
                            payload,
                            polls: observed.polls,
                            elapsed: started.elapsed(),
                        });
                    }
                    TaskStatus::Failed { reason } => {
                        return PollState::Done(PollOutcome::Failed {
                            reason,
                            polls: observed.polls,
                        });
                    }
                    TaskStatus::Pending { .. } | TaskStatus::Running { .. } => {}
                }
            }
        }

        let pause = self
            .poll_interval
            .min(deadline.saturating_duration_since(Instant::now()));

        tokio::select! {
            biased;
            _ = shutdown_requested(&mut self.shutdown) => {
                PollState::Done(PollOutcome::Cancelled { polls: observed.polls })
            }
            _ = sleep(pause) => PollState::Polling,
        }
    }

    fn observe(
        &self,
        task: &TaskHandle,
        status: &TaskStatus,
        started: Instant,
        observed: &mut Observed,
        observer: &dyn TaskObserver,
    ) {
        let state = status.state();
        debug!(task_id = %task, status = %state, "task status");

        if observed.state != Some(state) {
            notify(
                observer,
                TaskEvent::StatusChanged {
                    task: task.clone(),
                    from: observed.state,
                    to: state,
                },
            );
            observed.state = Some(state);
        }

        if state.is_terminal() {
            return;
        }

        if let Some(percent) = status.progress() {
            if observed.progress != Some(percent) {
                notify(
                    observer,
                    TaskEvent::Progress {
                        task: task.clone(),
                        percent,
                        elapsed: started.elapsed(),
                    },
                );
                observed.progress = Some(percent);
            }
        }
    }

    fn report(&self, task: &TaskHandle, outcome: &PollOutcome, observer: &dyn TaskObserver) {
        let event = match outcome {
            PollOutcome::Completed { elapsed, polls, .. } => {
                info!(task_id = %task, polls, elapsed_s = elapsed.as_secs(), "task completed");
                TaskEvent::Completed {
                    task: task.clone(),
                    elapsed: *elapsed,
                }
            }
            PollOutcome::Failed { reason, polls } => {
                warn!(task_id = %task, polls, reason = ?reason, "task failed");
                TaskEvent::Failed {
                    task: task.clone(),
                    reason: reason.clone(),
                }
            }
            PollOutcome::TimedOut { elapsed, polls } => {
                warn!(task_id = %task, polls, elapsed_s = elapsed.as_secs(), "task timed out");
                TaskEvent::TimedOut {
                    task: task.clone(),
                    elapsed: *elapsed,
                }
            }
            PollOutcome::Cancelled { polls } => {
                info!(task_id = %task, polls, "stopped waiting for task");
                TaskEvent::Cancelled { task: task.clone() }
            }
        };
        notify(observer, event);
    }
}

/// Stand-in deadline for timeouts too large for `Instant`, about 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Resolves once the shutdown flag reads `true`; never resolves without a
/// receiver or after the sender is dropped.
pub(crate) async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = shutdown {
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
    std::future::pending::<()>().await
}
