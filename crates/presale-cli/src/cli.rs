//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Presale relay - turn a company URL into a presale document pack
#[derive(Parser, Debug)]
#[command(name = "presale-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one research task and download its files
    Run {
        /// Company website (https:// is added when missing)
        #[arg(short, long)]
        url: String,

        /// Purpose of the engagement
        #[arg(short, long, default_value = "introduction/qualification")]
        goal: String,

        /// Known constraints (budget, timing, stack)
        #[arg(short, long, default_value = "unknown")]
        constraints: String,

        /// Download root (default: PRESALE_DOWNLOAD_DIR or the state dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Catalogue ids to request, comma-separated (the dossier is always added)
        #[arg(short, long, value_delimiter = ',')]
        docs: Vec<String>,
    },

    /// Print the expected file names
    Manifest {
        /// Catalogue ids to resolve instead of the configured manifest
        #[arg(short, long, value_delimiter = ',')]
        docs: Vec<String>,

        /// List the document catalogue instead
        #[arg(long, conflicts_with = "docs")]
        catalogue: bool,
    },

    /// Print the effective settings (API key masked)
    Config,
}

/// Why a target URL was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetUrlError {
    #[error("URL is empty")]
    Empty,

    #[error("not a valid URL: {0}")]
    Invalid(String),

    #[error("only http and https URLs are supported, got {0}")]
    Scheme(String),

    #[error("URL has no host")]
    NoHost,
}

/// Validates a target URL, adding `https://` when no scheme is given.
pub fn normalize_target_url(raw: &str) -> Result<Url, TargetUrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TargetUrlError::Empty);
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| TargetUrlError::Invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(TargetUrlError::Scheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TargetUrlError::NoHost);
    }
    Ok(url)
}
