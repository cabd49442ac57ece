//! File downloads with bounded retries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use presale_models::RetrievedArtifact;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::FetchError;
use crate::event::{notify, TaskEvent, TaskObserver};

/// Where file bytes come from.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Downloads the full body at `url`.
    ///
    /// Anything but HTTP 200 is an error.
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Plain HTTP GET file source.
#[derive(Debug, Clone, Default)]
pub struct HttpFileSource {
    client: reqwest::Client,
}

impl HttpFileSource {
    /// Creates a source with a fresh HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that shares an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FileSource for HttpFileSource {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Result of fetching one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file is on disk.
    Retrieved {
        /// Where it landed.
        path: PathBuf,
        /// Attempts it took.
        attempts: u32,
    },
    /// Every attempt failed. Expected and recoverable: the caller carries
    /// on without this file.
    NotRetrieved {
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        last_error: FetchError,
    },
}

impl FetchOutcome {
    /// The local path, if the file was retrieved.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FetchOutcome::Retrieved { path, .. } => Some(path),
            FetchOutcome::NotRetrieved { .. } => None,
        }
    }
}

/// Downloads single files with retry and exponential backoff.
#[derive(Debug, Clone)]
pub struct FileFetcher<S> {
    source: S,
    max_attempts: u32,
    attempt_timeout: Duration,
    backoff_base: Duration,
}

impl<S: FileSource> FileFetcher<S> {
    /// Creates a fetcher using the download knobs in `config`.
    pub fn new(source: S, config: &RuntimeConfig) -> Self {
        Self {
            source,
            max_attempts: config.download_max_attempts.max(1),
            attempt_timeout: config.download_timeout,
            backoff_base: config.backoff_base,
        }
    }

    /// Downloads `source_url` into `dest_dir` under a sanitized version of
    /// `suggested_name`.
    ///
    /// Makes at most `max_attempts` attempts. After failed attempt `i`
    /// (0-based) it waits `backoff_base * 2^i`, except after the last one.
    pub async fn fetch(
        &self,
        source_url: &str,
        suggested_name: &str,
        dest_dir: &Path,
        observer: &dyn TaskObserver,
    ) -> FetchOutcome {
        let file_name = sanitize_file_name(suggested_name);
        if file_name != suggested_name {
            debug!(original = %suggested_name, sanitized = %file_name, "file name sanitized");
        }

        let mut last_error = FetchError::Transport("no attempt made".into());

        for attempt in 0..self.max_attempts {
            match self.attempt(source_url, &file_name, dest_dir).await {
                Ok(path) => {
                    info!(file = %suggested_name, path = %path.display(), attempts = attempt + 1, "file downloaded");
                    return FetchOutcome::Retrieved {
                        path,
                        attempts: attempt + 1,
                    };
                }
                Err(e) => {
                    warn!(file = %suggested_name, attempt = attempt + 1, error = %e, "download attempt failed");
                    last_error = e;
                }
            }

            if attempt + 1 < self.max_attempts {
                let delay = self.backoff_delay(attempt);
                notify(
                    observer,
                    TaskEvent::DownloadRetrying {
                        name: suggested_name.to_string(),
                        attempt: attempt + 1,
                        delay,
                        error: last_error.clone(),
                    },
                );
                tokio::time::sleep(delay).await;
            }
        }

        FetchOutcome::NotRetrieved {
            attempts: self.max_attempts,
            last_error,
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn attempt(
        &self,
        url: &str,
        file_name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, FetchError> {
        let bytes = tokio::time::timeout(self.attempt_timeout, self.source.download(url))
            .await
            .map_err(|_| FetchError::Timeout(self.attempt_timeout))??;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| FetchError::Write(e.to_string()))?;

        let path = unique_path(dest_dir, file_name).await;
        write_artifact(&path, &bytes).await?;

        Ok(path)
    }
}

/// Writes `bytes` to `path`, removing whatever was written if that fails.
async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Err(e) = tokio::fs::write(path, bytes).await {
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %cleanup, "failed to remove partial file");
            }
        }
        return Err(FetchError::Write(e.to_string()));
    }
    Ok(())
}

/// Reduces a name to Unicode letters/digits and `._- `.
///
/// A result that is empty or only dots (which would point at the
/// directory itself or its parent) becomes a timestamp placeholder.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.chars().all(|c| c == '.') {
        placeholder_name()
    } else {
        cleaned.to_string()
    }
}

fn placeholder_name() -> String {
    format!("file_{}", Utc::now().format("%Y%m%d_%H%M%S_%9f"))
}

/// Picks `dir/name`, or `dir/stem_N.ext` when that already exists.
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !exists(&candidate).await {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 2u32.. {
        let next = match &ext {
            Some(ext) => dir.join(format!("{}_{}.{}", stem, n, ext)),
            None => dir.join(format!("{}_{}", stem, n)),
        };
        if !exists(&next).await {
            return next;
        }
    }
    candidate
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Deletes delivered files once the caller has handed them on.
///
/// Returns how many were removed; files already gone are not errors.
pub async fn cleanup_artifacts(artifacts: &[RetrievedArtifact]) -> usize {
    let mut removed = 0;
    for artifact in artifacts {
        match tokio::fs::remove_file(&artifact.local_path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %artifact.local_path.display(), error = %e, "failed to remove artifact")
            }
        }
    }
    removed
}
