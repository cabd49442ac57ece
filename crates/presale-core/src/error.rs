//! Error types for configuration loading.

use thiserror::Error;

/// Errors that can occur while reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set (or is blank).
    #[error("{0} not set. Add it to the environment or the .env file.")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Dotenv file could not be read.
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
