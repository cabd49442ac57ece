//! File references, retrieved artifacts and manifest reconciliation types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// MIME type assumed when a file descriptor does not carry one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A pointer to one generated file, discovered inside a result payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Where the file can be downloaded from.
    pub source_url: String,
    /// Name the remote gave the file.
    pub display_name: String,
    /// MIME type, defaulted when absent.
    pub mime_type: String,
}

impl FileReference {
    /// Creates a reference with the default MIME type.
    pub fn new(source_url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            display_name: display_name.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }

    /// Sets the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// A file that was downloaded to local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedArtifact {
    /// Name the remote gave the file (used for reconciliation).
    pub display_name: String,
    /// Where the bytes landed.
    pub local_path: PathBuf,
}

/// The fixed set of file names a complete task run should produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedManifest {
    names: BTreeSet<String>,
}

impl ExpectedManifest {
    /// Creates a manifest from any collection of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the required names in sorted order.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Returns true if `name` is required.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of required names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing is required.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Outcome of comparing retrieved names against an expected manifest.
///
/// `delivered` is reported as-is. Names outside the manifest also appear in
/// `unexpected` so callers can show them instead of dropping them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionReport {
    /// Every name that was retrieved.
    pub delivered: BTreeSet<String>,
    /// Expected names that were not retrieved.
    pub missing: BTreeSet<String>,
    /// Retrieved names that the manifest does not list.
    pub unexpected: BTreeSet<String>,
}

impl CompletionReport {
    /// Returns true when nothing expected is missing.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Number of expected names that were delivered.
    pub fn expected_delivered(&self) -> usize {
        self.delivered.difference(&self.unexpected).count()
    }
}
