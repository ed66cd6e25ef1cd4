//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use drawdle_core::Mode;
use drawdle_renderer::{CanvasConfig, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};

/// Default scoring service root.
pub const DEFAULT_SCORING_URL: &str = "http://127.0.0.1:5000";

/// Timeout applied to every HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line arguments for `drawdle`.
#[derive(Debug, Clone, Parser)]
#[command(name = "drawdle")]
#[command(about = "Play a Drawdle round from a scripted sequence of canvas commands")]
#[command(version)]
pub struct CliArgs {
    /// Scoring service root URL (serves /submit and /target)
    #[arg(long, env = "DRAWDLE_SCORING_URL", default_value = DEFAULT_SCORING_URL)]
    pub scoring_url: String,

    /// Leaderboard root URL; defaults to the scoring URL
    #[arg(long, env = "DRAWDLE_LEADERBOARD_URL")]
    pub leaderboard_url: Option<String>,

    /// Directory for persisted session state; in-memory when absent
    #[arg(long, env = "DRAWDLE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Player name shown on the leaderboard
    #[arg(long)]
    pub name: Option<String>,

    /// Difficulty: easy or hard
    #[arg(long)]
    pub mode: Option<Mode>,

    /// Allow more than one round per day
    #[arg(long)]
    pub allow_multiple_plays: bool,

    /// Canvas backing width in pixels
    #[arg(long, default_value_t = DEFAULT_CANVAS_WIDTH)]
    pub width: u32,

    /// Canvas backing height in pixels
    #[arg(long, default_value_t = DEFAULT_CANVAS_HEIGHT)]
    pub height: u32,

    /// JSON file with the command script to replay
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Write the final snapshot to this path
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scoring service root URL.
    pub scoring_url: String,
    /// Leaderboard root URL.
    pub leaderboard_url: String,
    /// Session state directory, if persisted.
    pub data_dir: Option<PathBuf>,
    /// Player name override.
    pub player_name: Option<String>,
    /// Mode override.
    pub mode: Option<Mode>,
    /// Whether the daily lock is lifted.
    pub allow_multiple_plays: bool,
    /// Canvas size and snapshot encoding.
    pub canvas: CanvasConfig,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Command script to replay.
    pub script: Option<PathBuf>,
    /// Where to write the final snapshot.
    pub out: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scoring_url: DEFAULT_SCORING_URL.to_string(),
            leaderboard_url: DEFAULT_SCORING_URL.to_string(),
            data_dir: None,
            player_name: None,
            mode: None,
            allow_multiple_plays: false,
            canvas: CanvasConfig::default(),
            request_timeout: REQUEST_TIMEOUT,
            script: None,
            out: None,
        }
    }
}

impl From<CliArgs> for ClientConfig {
    fn from(args: CliArgs) -> Self {
        let leaderboard_url = args
            .leaderboard_url
            .unwrap_or_else(|| args.scoring_url.clone());
        Self {
            scoring_url: args.scoring_url,
            leaderboard_url,
            data_dir: args.data_dir,
            player_name: args.name,
            mode: args.mode,
            allow_multiple_plays: args.allow_multiple_plays,
            canvas: CanvasConfig {
                width: args.width,
                height: args.height,
                ..CanvasConfig::default()
            },
            request_timeout: REQUEST_TIMEOUT,
            script: args.script,
            out: args.out,
        }
    }
}
