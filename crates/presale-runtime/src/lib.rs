//! Task lifecycle runtime for the presale relay.
//!
//! This crate turns a research request into a set of downloaded files:
//! - `ManusClient` - creates remote tasks and reads their status
//! - `TaskPoller` - waits for a task under a wall-clock deadline
//! - `FileReferenceExtractor` - finds file descriptors in the result payload
//! - `FileFetcher` - downloads each file with bounded retries
//! - `reconcile` - compares delivered names against the expected manifest
//! - `TaskCoordinator` - main entry point running all of the above
//!
//! # Example
//!
//! ```ignore
//! use presale_core::RelaySettings;
//! use presale_models::SessionId;
//! use presale_runtime::{
//!     HttpFileSource, LogObserver, ManusClient, RuntimeConfig, SessionContext,
//!     TaskCoordinator, TaskProfile, TaskRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = RelaySettings::from_env()?;
//!     let config = RuntimeConfig::from(&settings);
//!     let client = ManusClient::from_settings(&settings, config.request_timeout)?;
//!
//!     let coordinator = TaskCoordinator::new(
//!         client,
//!         HttpFileSource::new(),
//!         TaskProfile::from(&settings),
//!         config,
//!     );
//!
//!     let session = SessionContext::new(SessionId::new(), &settings.download_dir);
//!     let request = TaskRequest::new("https://example.com", "qualification", "unknown");
//!     let report = coordinator.run(&session, &request, &LogObserver).await?;
//!
//!     println!("missing: {:?}", report.completion.missing);
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Polling
//!
//! The poller checks the deadline at the top of every tick, never sleeps
//! past it, and abandons a status call still running when it passes.
//! Status-check errors are reported as events and polling continues.
//!
//! ## Downloads
//!
//! Files are fetched one at a time. A file that fails every attempt is
//! listed in the report and counted as missing; it does not fail the run.
//!
//! ## Observers
//!
//! Progress is reported through `TaskObserver`. Observer errors and panics
//! are logged and never reach the poller or the coordinator.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod extractor;
pub mod fetcher;
pub mod poller;
pub mod reconciler;

pub use client::{id_from_keys, parse_status, IdExtractor, ManusClient, TaskApi};
pub use config::RuntimeConfig;
pub use coordinator::{
    PlainPromptRenderer, PromptRenderer, SessionContext, TaskCoordinator, TaskProfile, TaskReport,
    TaskRequest, UnretrievedFile,
};
pub use error::{FetchError, RelayError, Result};
pub use event::{
    ChannelObserver, LogObserver, NoopObserver, ObserverResult, TaskEvent, TaskObserver,
};
pub use extractor::{FileKeys, FileReferenceExtractor};
pub use fetcher::{
    cleanup_artifacts, sanitize_file_name, FetchOutcome, FileFetcher, FileSource, HttpFileSource,
};
pub use poller::{PollOutcome, TaskPoller};
pub use reconciler::{reconcile, reconcile_artifacts};
