//! # Drawdle Core
//!
//! Rules and data model for a daily draw-and-guess round. Pure logic with no
//! async runtime and no network; the renderer and client crates build on it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                drawdle-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Drawing           │  Round                 │
//! │  - Pointer tracker │  - Attempt machine     │
//! │  - Strokes/brush   │  - Hint economy        │
//! │  - Stroke store    │  - Countdown, reveal   │
//! ├─────────────────────────────────────────────┤
//! │  Scoring wire types │  Session + daily lock │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod drawing;
pub mod error;
pub mod hint;
pub mod input;
pub mod reveal;
pub mod round;
pub mod scoring;
pub mod session;
pub mod stroke;
pub mod timer;

pub use drawing::StrokeStore;
pub use error::{CoreError, CoreResult};
pub use hint::{HintEconomy, HintToggle};
pub use input::{DisplayRect, PointerInputTracker, PointerPhase};
pub use reveal::{RevealCycle, RevealSequencer, RevealStage};
pub use round::{Mode, Outcome, Phase, RoundState, Transition, GUESS_HISTORY_LEN, MAX_ATTEMPTS};
pub use scoring::{
    compute_score, LeaderboardEntry, ScoreRequest, ScoreResponse, SubmissionResult, TargetRecord,
};
pub use session::{FileStore, KeyValueStore, MemoryStore, SessionContext, SessionError};
pub use stroke::{
    colour_label, Brush, Color, Point, Stroke, StrokeKind, DEFAULT_BRUSH_WIDTH, MAX_BRUSH_WIDTH,
    MIN_BRUSH_WIDTH, PALETTE,
};
pub use timer::{Countdown, TickOutcome, ATTEMPT_SECONDS, TICK_INTERVAL};

/// Drawdle core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
