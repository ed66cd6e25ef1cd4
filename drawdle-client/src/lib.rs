//! # Drawdle Client Library
//!
//! Async runtime layer for a Drawdle round: the event-driven
//! [`RoundController`], the cancellable [`Scheduler`] behind its timers, and
//! HTTP clients for the scoring service and leaderboard. Used by the
//! `drawdle` binary and by integration tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod leaderboard;
pub mod metrics;
pub mod scheduler;
pub mod scoring;

pub use config::{CliArgs, ClientConfig};
pub use controller::{
    NoticeKind, RoundCommand, RoundController, RoundDeps, RoundHandle, RoundReport, RoundTimings,
    RoundUpdate,
};
pub use leaderboard::{HttpLeaderboard, LeaderboardError, LeaderboardReporter};
pub use scheduler::{Scheduled, Scheduler, TaskGroup};
pub use scoring::{HttpScoringService, ScoringError, ScoringService};
