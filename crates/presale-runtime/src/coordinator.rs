//! One task run from prompt to reconciled artifacts.
//!
//! The coordinator keeps no state between runs: everything that belongs to
//! the caller (session id, download root, shutdown signal) arrives in a
//! [`SessionContext`].

use std::path::PathBuf;

use presale_core::RelaySettings;
use presale_models::{
    CompletionReport, ExpectedManifest, FileReference, RetrievedArtifact, SessionId, TaskHandle,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::TaskApi;
use crate::config::RuntimeConfig;
use crate::error::{FetchError, RelayError, Result};
use crate::event::{notify, TaskEvent, TaskObserver};
use crate::extractor::{FileKeys, FileReferenceExtractor};
use crate::fetcher::{sanitize_file_name, FetchOutcome, FileFetcher, FileSource};
use crate::poller::{shutdown_requested, PollOutcome, TaskPoller};
use crate::reconciler::reconcile_artifacts;

/// What the caller wants researched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Company website.
    pub target_url: String,
    /// Purpose of the engagement.
    pub goal: String,
    /// Known constraints (budget, timing, stack).
    pub constraints: String,
}

impl TaskRequest {
    /// Creates a request.
    pub fn new(
        target_url: impl Into<String>,
        goal: impl Into<String>,
        constraints: impl Into<String>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            goal: goal.into(),
            constraints: constraints.into(),
        }
    }
}

/// Caller-owned context for one run.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Who the run is for.
    pub session_id: SessionId,
    /// Downloads land under `<download_root>/<session_id>/<task_id>/`.
    pub download_root: PathBuf,
    shutdown: Option<watch::Receiver<bool>>,
}

impl SessionContext {
    /// Creates a context.
    pub fn new(session_id: SessionId, download_root: impl Into<PathBuf>) -> Self {
        Self {
            session_id,
            download_root: download_root.into(),
            shutdown: None,
        }
    }

    /// Stops the run once `shutdown` reads `true`.
    ///
    /// Checked while creating the task, while polling and before and during
    /// each download. The remote task is left running.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Returns true once the shutdown flag has been raised.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.as_ref().map_or(false, |rx| *rx.borrow())
    }

    /// Directory files for `task` are written to.
    pub fn task_dir(&self, task: &TaskHandle) -> PathBuf {
        self.download_root
            .join(sanitize_file_name(self.session_id.as_str()))
            .join(sanitize_file_name(task.as_str()))
    }
}

/// Turns a request into the prompt sent to the remote.
pub trait PromptRenderer: Send + Sync {
    /// Renders the prompt.
    fn render(&self, request: &TaskRequest, manifest: &ExpectedManifest) -> String;
}

/// Lists the request fields and the expected file names, nothing more.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainPromptRenderer;

impl PromptRenderer for PlainPromptRenderer {
    fn render(&self, request: &TaskRequest, manifest: &ExpectedManifest) -> String {
        let mut prompt = format!(
            "URL: {}\nGoal: {}\nConstraints: {}\n\nProduce these files:\n",
            request.target_url, request.goal, request.constraints
        );
        for name in manifest.names() {
            prompt.push_str("- ");
            prompt.push_str(name);
            prompt.push('\n');
        }
        prompt
    }
}

/// Remote-side settings for task creation.
#[derive(Debug, Clone)]
pub struct TaskProfile {
    /// Project the task is filed under.
    pub project_id: String,
    /// Agent profile to run.
    pub agent_profile: String,
    /// Files a complete run produces.
    pub manifest: ExpectedManifest,
}

impl From<&RelaySettings> for TaskProfile {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            project_id: settings.project_id.clone(),
            agent_profile: settings.agent_profile.clone(),
            manifest: settings.expected.clone(),
        }
    }
}

impl TaskProfile {
    /// Replaces the expected files.
    pub fn with_manifest(mut self, manifest: ExpectedManifest) -> Self {
        self.manifest = manifest;
        self
    }
}

/// A referenced file that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnretrievedFile {
    /// The reference from the payload.
    pub reference: FileReference,
    /// Attempts made.
    pub attempts: u32,
    /// Error from the last attempt.
    pub error: FetchError,
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// The remote task.
    pub task: TaskHandle,
    /// Files on disk, in download order.
    pub artifacts: Vec<RetrievedArtifact>,
    /// Referenced files that could not be fetched.
    pub not_retrieved: Vec<UnretrievedFile>,
    /// Delivered/missing/unexpected against the manifest.
    pub completion: CompletionReport,
    /// Where `artifacts` were written.
    pub download_dir: PathBuf,
}

/// Runs tasks end to end.
pub struct TaskCoordinator<A, S> {
    api: A,
    fetcher: FileFetcher<S>,
    extractor: FileReferenceExtractor,
    renderer: Box<dyn PromptRenderer>,
    profile: TaskProfile,
    config: RuntimeConfig,
}

impl<A: TaskApi, S: FileSource> TaskCoordinator<A, S> {
    /// Creates a coordinator with the plain prompt renderer and default
    /// file keys.
    pub fn new(api: A, source: S, profile: TaskProfile, config: RuntimeConfig) -> Self {
        Self {
            api,
            fetcher: FileFetcher::new(source, &config),
            extractor: FileReferenceExtractor::new(),
            renderer: Box::new(PlainPromptRenderer),
            profile,
            config,
        }
    }

    /// Replaces the prompt renderer.
    pub fn with_renderer(mut self, renderer: impl PromptRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Changes the keys that mark file descriptors in the result payload.
    pub fn with_file_keys(mut self, keys: FileKeys) -> Self {
        self.extractor = FileReferenceExtractor::with_keys(keys);
        self
    }

    /// The manifest runs are reconciled against.
    pub fn manifest(&self) -> &ExpectedManifest {
        &self.profile.manifest
    }

    /// Creates a task, waits for it, downloads its files and reconciles
    /// them against the manifest.
    ///
    /// Remote rejection, remote failure, the deadline and cancellation end
    /// the run with an error. Files downloaded before a cancellation stay
    /// on disk. Individual download failures do not; they
    /// show up in [`TaskReport::not_retrieved`] and as missing names.
    pub async fn run(
        &self,
        session: &SessionContext,
        request: &TaskRequest,
        observer: &dyn TaskObserver,
    ) -> Result<TaskReport> {
        info!(
            session_id = %session.session_id,
            target = %request.target_url,
            "starting task run"
        );

        let mut shutdown = session.shutdown.clone();
        let prompt = self.renderer.render(request, &self.profile.manifest);
        let task = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                info!(session_id = %session.session_id, "run cancelled before task creation");
                return Err(RelayError::Cancelled { task: None });
            }
            created = self.api.create_task(
                &prompt,
                &self.profile.project_id,
                &self.profile.agent_profile,
            ) => created?,
        };
        notify(observer, TaskEvent::TaskCreated { task: task.clone() });

        let mut poller = TaskPoller::new(&self.api, &self.config);
        if let Some(shutdown) = &session.shutdown {
            poller = poller.with_shutdown(shutdown.clone());
        }

        let payload = match poller.wait(&task, observer).await {
            PollOutcome::Completed { payload, .. } => payload,
            PollOutcome::Failed { reason, .. } => {
                return Err(RelayError::RemoteFailure { task, reason })
            }
            PollOutcome::TimedOut { elapsed, .. } => {
                return Err(RelayError::DeadlineExceeded { task, elapsed })
            }
            PollOutcome::Cancelled { .. } => {
                return Err(RelayError::Cancelled { task: Some(task) })
            }
        };

        let references = self.extractor.extract(&payload);
        info!(task_id = %task, count = references.len(), "file references found");
        notify(
            observer,
            TaskEvent::ReferencesFound {
                task: task.clone(),
                count: references.len(),
            },
        );

        let download_dir = session.task_dir(&task);
        let total = references.len();
        let mut artifacts = Vec::with_capacity(total);
        let mut not_retrieved = Vec::new();

        for (index, reference) in references.into_iter().enumerate() {
            if session.is_shut_down() {
                info!(task_id = %task, downloaded = artifacts.len(), "run cancelled during downloads");
                return Err(RelayError::Cancelled { task: Some(task) });
            }

            let name = reference.display_name.clone();
            notify(
                observer,
                TaskEvent::DownloadStarted {
                    name: name.clone(),
                    index: index + 1,
                    total,
                },
            );

            let outcome = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!(task_id = %task, file = %name, "run cancelled mid-download");
                    return Err(RelayError::Cancelled { task: Some(task) });
                }
                outcome = self.fetcher.fetch(&reference.source_url, &name, &download_dir, observer) => outcome,
            };

            match outcome {
                FetchOutcome::Retrieved { path, attempts } => {
                    notify(
                        observer,
                        TaskEvent::DownloadFinished {
                            name: name.clone(),
                            path: path.clone(),
                            attempts,
                        },
                    );
                    artifacts.push(RetrievedArtifact {
                        display_name: name,
                        local_path: path,
                    });
                }
                FetchOutcome::NotRetrieved {
                    attempts,
                    last_error,
                } => {
                    warn!(task_id = %task, file = %name, attempts, error = %last_error, "file not retrieved");
                    notify(
                        observer,
                        TaskEvent::DownloadExhausted {
                            name,
                            attempts,
                            error: last_error.clone(),
                        },
                    );
                    not_retrieved.push(UnretrievedFile {
                        reference,
                        attempts,
                        error: last_error,
                    });
                }
            }
        }

        let completion = reconcile_artifacts(&self.profile.manifest, &artifacts);
        info!(
            task_id = %task,
            delivered = completion.delivered.len(),
            missing = completion.missing.len(),
            unexpected = completion.unexpected.len(),
            "task run reconciled"
        );
        notify(
            observer,
            TaskEvent::Reconciled {
                task: task.clone(),
                report: completion.clone(),
            },
        );

        Ok(TaskReport {
            task,
            artifacts,
            not_retrieved,
            completion,
            download_dir,
        })
    }
}
