//! # Drawdle
//!
//! Plays one round from a JSON command script against a live scoring
//! service, printing every round update as a JSON line.
//!
//! The script is an array of round commands, plus `{"wait_ms": n}` entries
//! that pause between them:
//!
//! ```json
//! [
//!   {"type": "pointer", "phase": "down", "x": 100, "y": 100},
//!   {"type": "pointer", "phase": "move", "x": 300, "y": 240},
//!   {"type": "pointer", "phase": "up"},
//!   {"type": "submit"},
//!   {"wait_ms": 4000}
//! ]
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use drawdle_client::{
    CliArgs, ClientConfig, HttpLeaderboard, HttpScoringService, RoundCommand, RoundController,
    RoundDeps, RoundTimings, RoundUpdate,
};
use drawdle_core::session::today_utc;
use drawdle_core::{FileStore, KeyValueStore, MemoryStore, SessionContext};
use drawdle_renderer::CanvasEngine;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// One entry of a command script.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptStep {
    Wait { wait_ms: u64 },
    Command(RoundCommand),
}

/// Initialize tracing with optional JSON output.
///
/// Set `RUST_LOG` to control log levels (default: info,drawdle_client=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,drawdle_client=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn load_script(config: &ClientConfig) -> anyhow::Result<Vec<ScriptStep>> {
    let Some(path) = &config.script else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
}

fn open_session(config: &ClientConfig) -> anyhow::Result<SessionContext> {
    let store: Arc<dyn KeyValueStore> = match &config.data_dir {
        Some(dir) => Arc::new(FileStore::open(dir).context("opening session store")?),
        None => Arc::new(MemoryStore::new()),
    };
    let mut session = SessionContext::load(store, today_utc());
    if let Some(name) = &config.player_name {
        session.set_player_name(name)?;
    }
    if let Some(mode) = config.mode {
        session.set_mode(mode)?;
    }
    if config.allow_multiple_plays {
        session.set_allow_multiple_plays(true)?;
    }
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from(CliArgs::parse());
    tracing::info!(
        scoring = %config.scoring_url,
        leaderboard = %config.leaderboard_url,
        "starting drawdle"
    );

    let script = load_script(&config)?;
    let session = open_session(&config)?;
    let scoring = HttpScoringService::new(&config.scoring_url, config.request_timeout)?;
    let leaderboard = HttpLeaderboard::new(&config.leaderboard_url, config.request_timeout)?;
    let canvas = CanvasEngine::new(config.canvas)?;

    let mut handle = RoundController::start(RoundDeps {
        session,
        canvas,
        scoring: Arc::new(scoring),
        leaderboard: Arc::new(leaderboard),
        timings: RoundTimings::default(),
    })?;

    let commands = handle.commands();
    let driver = tokio::spawn(async move {
        for step in script {
            match step {
                ScriptStep::Wait { wait_ms } => {
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
                ScriptStep::Command(command) => {
                    if commands.send(command).await.is_err() {
                        tracing::info!("round finished before the script ended");
                        return;
                    }
                }
            }
        }
        let _ = commands.send(RoundCommand::Teardown).await;
    });

    while let Some(update) = handle.next_update().await {
        println!("{}", serde_json::to_string(&update)?);
        if update == RoundUpdate::Closed {
            break;
        }
    }
    driver.abort();
    let report = handle.join().await?;

    tracing::info!(
        round = %report.round_id,
        outcome = ?report.outcome,
        score = ?report.score,
        attempts = report.attempts,
        "round closed"
    );

    if let Some(out) = &config.out {
        std::fs::write(out, report.final_snapshot.bytes())
            .with_context(|| format!("writing snapshot {}", out.display()))?;
        tracing::info!(path = %out.display(), "final snapshot written");
    }

    Ok(())
}
