//! Staged disclosure of a resolved submission.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One step in revealing a result. Stages are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealStage {
    /// Category and category match.
    Category,
    /// Submitted colour and colour match.
    Colour,
    /// The guess itself.
    Guess,
}

impl RevealStage {
    /// All stages in disclosure order.
    pub const ALL: [Self; 3] = [Self::Category, Self::Colour, Self::Guess];

    /// Delay after the response at which this stage fires.
    #[must_use]
    pub const fn delay(self) -> Duration {
        match self {
            Self::Category => Duration::from_millis(500),
            Self::Colour => Duration::from_millis(850),
            Self::Guess => Duration::from_millis(1200),
        }
    }
}

/// Identifier of one reveal cycle.
pub type RevealCycle = u64;

/// Tracks the live reveal cycle and the last stage it disclosed.
///
/// Starting or cancelling bumps the cycle, so stages scheduled under an
/// older cycle are refused by [`accept`](Self::accept).
#[derive(Debug, Clone, Default)]
pub struct RevealSequencer {
    cycle: RevealCycle,
    last: Option<RevealStage>,
    active: bool,
}

impl RevealSequencer {
    /// Create an idle sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle, abandoning any previous one.
    pub fn begin(&mut self) -> RevealCycle {
        self.cycle += 1;
        self.last = None;
        self.active = true;
        self.cycle
    }

    /// Abandon the current cycle.
    pub fn cancel(&mut self) {
        if self.active {
            tracing::trace!(cycle = self.cycle, "reveal cycle cancelled");
        }
        self.cycle += 1;
        self.last = None;
        self.active = false;
    }

    /// Current cycle id.
    #[must_use]
    pub fn cycle(&self) -> RevealCycle {
        self.cycle
    }

    /// Last stage disclosed in the current cycle.
    #[must_use]
    pub fn last_stage(&self) -> Option<RevealStage> {
        self.last
    }

    /// Record `stage` for `cycle` if it belongs to the live cycle and comes
    /// after the last disclosed stage.
    pub fn accept(&mut self, cycle: RevealCycle, stage: RevealStage) -> bool {
        if !self.active || cycle != self.cycle || self.last.is_some_and(|last| stage <= last) {
            return false;
        }
        self.last = Some(stage);
        if stage == RevealStage::Guess {
            self.active = false;
        }
        true
    }
}
