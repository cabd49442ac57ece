//! Core data models for the presale artifact relay.
//!
//! This crate provides the types shared by the runtime and its callers:
//! task handles and statuses, the schema-free result payload tree, file
//! references discovered inside it, and the manifest/report pair used to
//! judge whether a task delivered everything it was asked for. The document
//! catalogue lets callers build that manifest from a selection of ids.

pub mod artifact;
pub mod catalogue;
pub mod ids;
pub mod payload;
pub mod task;

// Re-export main types
pub use artifact::{
    CompletionReport, ExpectedManifest, FileReference, RetrievedArtifact, DEFAULT_MIME_TYPE,
};
pub use catalogue::{DocumentCatalogue, DocumentFormat, DocumentType, UnknownDocument};
pub use ids::{SessionId, TaskHandle};
pub use payload::{PayloadNode, Scalar};
pub use task::{TaskState, TaskStatus};
