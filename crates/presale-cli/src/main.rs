//! Presale relay binary.
//!
//! Run one task with:
//! ```bash
//! MANUS_API_KEY=xxx MANUS_PROJECT_ID=yyy cargo run -p presale-cli -- run --url example.com
//! ```

mod cli;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use presale_core::{config, expected_manifest_from_env, RelaySettings};
use presale_models::{DocumentCatalogue, ExpectedManifest, SessionId, UnknownDocument};
use presale_runtime::{
    ChannelObserver, HttpFileSource, ManusClient, RelayError, RuntimeConfig, SessionContext,
    TaskCoordinator, TaskProfile, TaskRequest,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::cli::{normalize_target_url, Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "presale_cli=info,presale_runtime=warn",
        1 => "presale_cli=debug,presale_runtime=info",
        2 => "presale_cli=trace,presale_runtime=debug,presale_core=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Config-dir .env first, then local .env.local / .env
    let loaded = config::load_env_files();
    tracing::debug!(files = loaded, "environment files loaded");

    match cli.command {
        Commands::Run {
            url,
            goal,
            constraints,
            out,
            docs,
        } => run(&url, goal, constraints, out, &docs).await,
        Commands::Manifest { docs, catalogue } => {
            if catalogue {
                print!("{}", output::render_catalogue(&DocumentCatalogue::standard()));
                return Ok(ExitCode::SUCCESS);
            }
            let manifest = selected_manifest(&docs)?.unwrap_or_else(expected_manifest_from_env);
            for name in manifest.names() {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            let settings = RelaySettings::from_env()?;
            println!("state dir:        {}", config::state_dir().display());
            println!("env file:         {}", config::env_file().display());
            println!("base url:         {}", settings.base_url);
            println!("api key:          {}", settings.masked_api_key());
            println!("project id:       {}", settings.project_id);
            println!("agent profile:    {}", settings.agent_profile);
            println!("task id keys:     {}", settings.task_id_keys.join(", "));
            println!("task timeout:     {}s", settings.task_timeout.as_secs());
            println!("polling interval: {}s", settings.polling_interval.as_secs());
            println!("download timeout: {}s", settings.download_timeout.as_secs());
            println!("download tries:   {}", settings.download_max_attempts);
            println!("download dir:     {}", settings.download_dir.display());
            println!("expected files:   {}", settings.expected.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(
    raw_url: &str,
    goal: String,
    constraints: String,
    out: Option<PathBuf>,
    docs: &[String],
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let target = normalize_target_url(raw_url)?;
    let selection = selected_manifest(docs)?;
    let settings = RelaySettings::from_env()?;

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "failed to create all directories");
    }

    let mut profile = TaskProfile::from(&settings);
    if let Some(manifest) = selection {
        tracing::debug!(files = manifest.len(), "using selected documents");
        profile = profile.with_manifest(manifest);
    }

    let runtime_config = RuntimeConfig::from(&settings);
    let client = ManusClient::from_settings(&settings, runtime_config.request_timeout)?;
    let coordinator =
        TaskCoordinator::new(client, HttpFileSource::new(), profile, runtime_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, no longer waiting for the task");
            let _ = shutdown_tx.send(true);
        }
    });

    let download_root = out.unwrap_or_else(|| settings.download_dir.clone());
    let session = SessionContext::new(SessionId::new(), download_root).with_shutdown(shutdown_rx);
    let request = TaskRequest::new(target.as_str(), goal, constraints);

    let (observer, mut events) = ChannelObserver::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(line) = output::describe(&event) {
                println!("{}", line);
            }
        }
    });

    println!("Researching {} (this can take a while)", target);
    let result = coordinator.run(&session, &request, &observer).await;

    drop(observer);
    let _ = printer.await;

    match result {
        Ok(report) => {
            print!("\n{}", output::render_report(&report));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_task_fatal(), "task run failed");
            eprintln!("{}", e.user_message());
            Ok(ExitCode::from(failure_code(&e)))
        }
    }
}

/// Manifest for `--docs`, or `None` when no documents were named.
fn selected_manifest(docs: &[String]) -> Result<Option<ExpectedManifest>, UnknownDocument> {
    if docs.is_empty() {
        return Ok(None);
    }
    ExpectedManifest::from_selection(&DocumentCatalogue::standard(), docs).map(Some)
}

/// 1 when the task itself ended badly, 2 when the relay could not do its job.
fn failure_code(error: &RelayError) -> u8 {
    if error.is_task_fatal() {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presale_models::TaskHandle;

    #[test]
    fn test_failure_code() {
        assert_eq!(failure_code(&RelayError::Cancelled { task: None }), 1);
        assert_eq!(
            failure_code(&RelayError::RemoteFailure {
                task: TaskHandle::from("t-1"),
                reason: None,
            }),
            1
        );
        assert_eq!(failure_code(&RelayError::Transport("reset".into())), 2);
        assert_eq!(failure_code(&RelayError::Configuration("no key".into())), 2);
    }

    #[test]
    fn test_selected_manifest() {
        assert_eq!(selected_manifest(&[]), Ok(None));

        let manifest = selected_manifest(&["roi".to_string()]).unwrap().unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("01_Досье_на_клиента.docx"));

        let err = selected_manifest(&["budget".to_string()]).unwrap_err();
        assert_eq!(err.id, "budget");
    }
}
