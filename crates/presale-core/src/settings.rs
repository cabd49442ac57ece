//! Relay settings read from the environment.
//!
//! # Environment Variables
//!
//! Required:
//! - `MANUS_API_KEY`: API key sent with every task request
//! - `MANUS_PROJECT_ID`: Project the tasks are created in
//!
//! Optional:
//! - `MANUS_BASE_URL`: API base URL (default: https://api.manus.ai)
//! - `MANUS_AGENT_PROFILE`: Agent profile (default: manus-1.6-lite)
//! - `MANUS_TASK_ID_KEYS`: Comma-separated keys holding the task id in a
//!   create response (default: `id,task_id`)
//! - `TASK_TIMEOUT`: Overall wait per task in seconds (default: 1500)
//! - `POLLING_INTERVAL`: Seconds between status checks (default: 10)
//! - `DOWNLOAD_TIMEOUT`: Per-attempt download timeout in seconds (default: 300)
//! - `DOWNLOAD_MAX_ATTEMPTS`: Download attempts per file (default: 3)
//! - `EXPECTED_ARTIFACTS`: Comma-separated expected file names

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use presale_models::ExpectedManifest;

use crate::config;
use crate::error::{ConfigError, Result};

/// API key sent as the `API_KEY` header.
pub const API_KEY_ENV: &str = "MANUS_API_KEY";
/// Task API base URL.
pub const BASE_URL_ENV: &str = "MANUS_BASE_URL";
/// Project new tasks are created in.
pub const PROJECT_ID_ENV: &str = "MANUS_PROJECT_ID";
/// Agent profile requested for new tasks.
pub const AGENT_PROFILE_ENV: &str = "MANUS_AGENT_PROFILE";
/// Comma-separated keys that may hold the task id in a create response.
pub const TASK_ID_KEYS_ENV: &str = "MANUS_TASK_ID_KEYS";
/// Overall wait per task, in seconds.
pub const TASK_TIMEOUT_ENV: &str = "TASK_TIMEOUT";
/// Pause between status checks, in seconds.
pub const POLLING_INTERVAL_ENV: &str = "POLLING_INTERVAL";
/// Per-attempt download bound, in seconds.
pub const DOWNLOAD_TIMEOUT_ENV: &str = "DOWNLOAD_TIMEOUT";
/// Download attempts per file.
pub const DOWNLOAD_MAX_ATTEMPTS_ENV: &str = "DOWNLOAD_MAX_ATTEMPTS";
/// Comma-separated file names the task should deliver.
pub const EXPECTED_ARTIFACTS_ENV: &str = "EXPECTED_ARTIFACTS";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.manus.ai";

/// Default agent profile.
pub const DEFAULT_AGENT_PROFILE: &str = "manus-1.6-lite";

/// The seven files a complete presale package contains.
pub const DEFAULT_EXPECTED_ARTIFACTS: [&str; 7] = [
    "Deal_Brief.pdf",
    "Use_Case_Map.xlsx",
    "ROI_Calc.xlsx",
    "Pilot_SOW.docx",
    "MAP.xlsx",
    "Mini_Deck.pptx",
    "Sources.md",
];

const DEFAULT_TASK_ID_KEYS: [&str; 2] = ["id", "task_id"];
const DEFAULT_TASK_TIMEOUT_SECS: u64 = 1500;
const DEFAULT_POLLING_INTERVAL_SECS: u64 = 10;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_DOWNLOAD_MAX_ATTEMPTS: u32 = 3;

/// Everything the relay needs to run a task, resolved once at startup.
#[derive(Clone)]
pub struct RelaySettings {
    /// API key, never logged in full.
    pub api_key: String,
    /// Task API base URL without a trailing slash.
    pub base_url: String,
    /// Project new tasks are created in.
    pub project_id: String,
    /// Agent profile requested for new tasks.
    pub agent_profile: String,
    /// Keys tried, in order, to find the task id in a create response.
    pub task_id_keys: Vec<String>,
    /// Overall wait per task.
    pub task_timeout: Duration,
    /// Pause between status checks.
    pub polling_interval: Duration,
    /// Bound on a single download attempt.
    pub download_timeout: Duration,
    /// Attempts per file, at least 1.
    pub download_max_attempts: u32,
    /// Files a complete task delivers.
    pub expected: ExpectedManifest,
    /// Root under which session folders are created.
    pub download_dir: PathBuf,
}

impl RelaySettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(API_KEY_ENV).ok_or(ConfigError::Missing(API_KEY_ENV))?;
        let project_id = get(PROJECT_ID_ENV).ok_or(ConfigError::Missing(PROJECT_ID_ENV))?;

        let base_url = get(BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let agent_profile =
            get(AGENT_PROFILE_ENV).unwrap_or_else(|| DEFAULT_AGENT_PROFILE.to_string());

        let task_id_keys = match get(TASK_ID_KEYS_ENV) {
            Some(raw) => {
                let keys = split_list(&raw);
                if keys.is_empty() {
                    return Err(ConfigError::Invalid {
                        name: TASK_ID_KEYS_ENV,
                        value: raw,
                        reason: "expected at least one key".into(),
                    });
                }
                keys
            }
            None => DEFAULT_TASK_ID_KEYS.iter().map(|s| s.to_string()).collect(),
        };

        let task_timeout = seconds(
            TASK_TIMEOUT_ENV,
            get(TASK_TIMEOUT_ENV),
            DEFAULT_TASK_TIMEOUT_SECS,
        )?;
        let polling_interval = seconds(
            POLLING_INTERVAL_ENV,
            get(POLLING_INTERVAL_ENV),
            DEFAULT_POLLING_INTERVAL_SECS,
        )?;
        let download_timeout = seconds(
            DOWNLOAD_TIMEOUT_ENV,
            get(DOWNLOAD_TIMEOUT_ENV),
            DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        )?;

        let download_max_attempts = match get(DOWNLOAD_MAX_ATTEMPTS_ENV) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: DOWNLOAD_MAX_ATTEMPTS_ENV,
                        value: raw,
                        reason: "expected a positive whole number".into(),
                    })
                }
            },
            None => DEFAULT_DOWNLOAD_MAX_ATTEMPTS,
        };

        let expected = expected_manifest(get(EXPECTED_ARTIFACTS_ENV).as_deref());

        let download_dir = match get(config::DOWNLOAD_DIR_ENV) {
            Some(raw) => config::expand_path(&raw),
            None => config::download_dir(),
        };

        Ok(Self {
            api_key,
            base_url,
            project_id,
            agent_profile,
            task_id_keys,
            task_timeout,
            polling_interval,
            download_timeout,
            download_max_attempts,
            expected,
            download_dir,
        })
    }

    /// The API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("agent_profile", &self.agent_profile)
            .field("task_id_keys", &self.task_id_keys)
            .field("task_timeout", &self.task_timeout)
            .field("polling_interval", &self.polling_interval)
            .field("download_timeout", &self.download_timeout)
            .field("download_max_attempts", &self.download_max_attempts)
            .field("expected", &self.expected)
            .field("download_dir", &self.download_dir)
            .finish()
    }
}

/// Reads only the expected manifest, so it can be shown without credentials.
pub fn expected_manifest_from_env() -> ExpectedManifest {
    expected_manifest(std::env::var(EXPECTED_ARTIFACTS_ENV).ok().as_deref())
}

fn expected_manifest(raw: Option<&str>) -> ExpectedManifest {
    match raw.map(split_list) {
        Some(names) if !names.is_empty() => ExpectedManifest::new(names),
        _ => ExpectedManifest::new(DEFAULT_EXPECTED_ARTIFACTS),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn seconds(name: &'static str, raw: Option<String>, default: u64) -> Result<Duration> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
            _ => Err(ConfigError::Invalid {
                name,
                value: raw,
                reason: "expected a positive number of seconds".into(),
            }),
        },
    }
}
