//! `detect` and `set-path` commands

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Args;
use crossbeam_channel::Receiver;
use serde::Serialize;

use super::exit_codes;
use crate::config::ConfigStore;
use crate::discovery::{DiscoverySession, DiscoveryState, InstallationLocator, SystemRegistry, TargetApp};

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SetPathArgs {
    /// Path to WeChat.exe
    pub path: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable form of a published discovery state
#[derive(Debug, Serialize)]
struct DiscoveryReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'static str>,
    hint: String,
    editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DiscoveryReport {
    fn from_state(state: &DiscoveryState) -> Self {
        let (status, source, error) = match state {
            DiscoveryState::Resolved(resolution) => (
                "resolved",
                Some(resolution.location.source().label()),
                resolution.persist_error.clone(),
            ),
            DiscoveryState::Unresolved => ("unresolved", None, state.error().map(|e| e.to_string())),
            DiscoveryState::Rejected { .. } => ("rejected", None, state.error().map(|e| e.to_string())),
        };

        Self {
            status,
            path: state.path().map(|p| p.display().to_string()),
            source,
            hint: state.hint(),
            editable: state.editable(),
            error,
        }
    }
}

fn build_session(config_path: PathBuf) -> (DiscoverySession, Receiver<DiscoveryState>) {
    let config = Arc::new(Mutex::new(ConfigStore::open(config_path)));
    let locator = InstallationLocator::new(TargetApp::wechat(), Arc::new(SystemRegistry::new()));
    let (tx, rx) = crossbeam_channel::unbounded();
    (DiscoverySession::new(config, Arc::new(locator), tx), rx)
}

/// Run the startup discovery off the calling thread and report the result.
pub async fn run_detect(config_path: PathBuf, args: DetectArgs) -> anyhow::Result<i32> {
    let (session, rx) = build_session(config_path);

    let state = session
        .spawn_startup()
        .await
        .context("discovery task failed")?;

    // A window would apply the published value to its path field
    let published = rx.try_recv().unwrap_or(state);
    tracing::debug!("Discovery published {:?}", published.path());
    report(&published, args.json)
}

/// Validate and store a user-chosen executable.
pub async fn run_set_path(config_path: PathBuf, args: SetPathArgs) -> anyhow::Result<i32> {
    let (session, _rx) = build_session(config_path);
    let state = session.apply_override(args.path);

    if !args.json && matches!(state, DiscoveryState::Rejected { .. }) {
        let filter = session.chooser_filter();
        println!(
            "{}: choose a file matching *.{} (start in {})",
            filter.title,
            filter.extensions.join(", *."),
            filter.initial_directory.display()
        );
    }

    report(&state, args.json)
}

fn report(state: &DiscoveryState, json: bool) -> anyhow::Result<i32> {
    let code = exit_code(state);
    if json {
        println!("{}", serde_json::to_string_pretty(&DiscoveryReport::from_state(state))?);
        return Ok(code);
    }

    println!("{}", state.hint());
    match state {
        DiscoveryState::Resolved(resolution) => {
            println!(
                "{} (from {})",
                resolution.location.path().display(),
                resolution.location.source()
            );
            if let Some(err) = &resolution.persist_error {
                eprintln!("Warning: {}", err);
            }
        }
        DiscoveryState::Unresolved | DiscoveryState::Rejected { .. } => {
            if let Some(err) = state.error() {
                eprintln!("{}", err);
            }
        }
    }
    Ok(code)
}

fn exit_code(state: &DiscoveryState) -> i32 {
    match state {
        DiscoveryState::Resolved(resolution) if resolution.persist_error.is_some() => {
            exit_codes::PERSISTENCE_FAILED
        }
        DiscoveryState::Resolved(_) => exit_codes::SUCCESS,
        DiscoveryState::Unresolved => exit_codes::UNRESOLVED,
        DiscoveryState::Rejected { .. } => exit_codes::VALIDATION_FAILED,
    }
}
