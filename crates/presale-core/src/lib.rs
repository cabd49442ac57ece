//! Configuration for the presale artifact relay.
//!
//! - [`config`] locates the state, download, config and log directories
//!   and the dotenv file.
//! - [`settings`] reads the relay's knobs (API credentials, timeouts, the
//!   expected manifest) from the environment.

pub mod config;
pub mod error;
pub mod settings;

pub use error::{ConfigError, Result};
pub use settings::{
    expected_manifest_from_env, RelaySettings, DEFAULT_AGENT_PROFILE, DEFAULT_BASE_URL,
    DEFAULT_EXPECTED_ARTIFACTS,
};
