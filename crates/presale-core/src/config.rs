//! Directory layout for the presale relay.
//!
//! # Storage Structure
//!
//! All application data is stored under `~/.presale-relay/`:
//!
//! ```text
//! ~/.presale-relay/
//! ├── config/       # .env with API credentials
//! ├── downloads/    # Retrieved artifacts, one folder per session/task
//! └── logs/         # Application logs
//! ```
//!
//! # Environment Variables
//!
//! - `PRESALE_STATE_DIR`: Override the base state directory
//! - `PRESALE_DOWNLOAD_DIR`: Override the download directory
//!
//! Both accept `~` and `$VAR` references.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, warn};

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "PRESALE_STATE_DIR";

/// Environment variable for custom download directory.
pub const DOWNLOAD_DIR_ENV: &str = "PRESALE_DOWNLOAD_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".presale-relay";

const CONFIG_SUBDIR: &str = "config";
const DOWNLOADS_SUBDIR: &str = "downloads";
const LOGS_SUBDIR: &str = "logs";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Expands `~` and environment references in a user-supplied path.
///
/// Falls back to the raw string when expansion fails (e.g. an unset
/// variable).
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

/// Get the relay state directory.
///
/// The state directory is determined by:
/// 1. `PRESALE_STATE_DIR` environment variable if set
/// 2. `~/.presale-relay` if home directory is available
/// 3. `.presale-relay` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(|raw| expand_path(&raw))
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

/// Get the logs directory.
pub fn logs_dir() -> PathBuf {
    state_dir().join(LOGS_SUBDIR)
}

/// Get the default download root.
///
/// Defaults to `~/.presale-relay/downloads/` or `PRESALE_DOWNLOAD_DIR`.
pub fn download_dir() -> PathBuf {
    std::env::var(DOWNLOAD_DIR_ENV)
        .map(|raw| expand_path(&raw))
        .unwrap_or_else(|_| state_dir().join(DOWNLOADS_SUBDIR))
}

/// Get the .env file path inside the config directory.
pub fn env_file() -> PathBuf {
    config_dir().join(".env")
}

/// Loads environment files and returns how many were applied.
///
/// The config-dir `.env` wins because it is loaded first and dotenvy never
/// overrides variables that are already set. A local `.env.local` or `.env`
/// is then tried for development checkouts. Missing files are not errors.
///
/// Call this after the tracing subscriber is installed.
pub fn load_env_files() -> usize {
    let mut loaded = usize::from(load_env_from(&env_file()));
    match dotenvy::from_filename(".env.local") {
        Ok(path) => {
            debug!(path = %path.display(), "loaded env file");
            loaded += 1;
        }
        Err(_) => {
            if let Ok(path) = dotenvy::dotenv() {
                debug!(path = %path.display(), "loaded env file");
                loaded += 1;
            }
        }
    }
    loaded
}

fn load_env_from(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded env file");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load env file");
            false
        }
    }
}

/// Ensure the state directory and all subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(logs_dir())?;
    std::fs::create_dir_all(download_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables can't be isolated between parallel tests, so
    // these check the path shapes rather than full paths.

    #[test]
    fn test_state_dir_shape() {
        let dir = state_dir();
        assert!(dir.is_absolute() || dir.ends_with(".presale-relay"));
    }

    #[test]
    fn test_config_dir_name() {
        assert!(config_dir().ends_with("config"));
    }

    #[test]
    fn test_logs_dir_name() {
        assert!(logs_dir().ends_with("logs"));
    }

    #[test]
    fn test_env_file_name() {
        assert!(env_file().ends_with(".env"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/tmp/relay"), PathBuf::from("/tmp/relay"));
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/relay"), home.join("relay"));
        }
    }

    #[test]
    fn test_expand_path_unset_var_falls_back() {
        let raw = "$PRESALE_SURELY_UNSET_VARIABLE_XYZ/dl";
        assert_eq!(expand_path(raw), PathBuf::from(raw));
    }

    #[test]
    fn test_load_env_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "PRESALE_TEST_ONLY_VAR=from-file\n").unwrap();

        assert!(load_env_from(&path));
        assert_eq!(
            std::env::var("PRESALE_TEST_ONLY_VAR").as_deref(),
            Ok("from-file")
        );
    }

    #[test]
    fn test_load_env_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_from(&dir.path().join("absent.env")));
    }
}
