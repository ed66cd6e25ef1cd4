//! Hard-mode per-attempt countdown.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds on the clock at the start of each hard-mode attempt.
pub const ATTEMPT_SECONDS: u32 = 10;

/// Interval between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// The clock is not running.
    Idle,
    /// Seconds left after the tick.
    Running(u32),
    /// The clock reached zero and stopped.
    Expired,
}

/// A seconds countdown that is either running or stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: Option<u32>,
}

impl Countdown {
    /// A stopped countdown.
    #[must_use]
    pub const fn stopped() -> Self {
        Self { remaining: None }
    }

    /// Restart at [`ATTEMPT_SECONDS`].
    pub fn reset(&mut self) {
        self.remaining = Some(ATTEMPT_SECONDS);
    }

    /// Stop without expiring.
    pub fn stop(&mut self) {
        self.remaining = None;
    }

    /// Seconds left, `None` when stopped.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Count down one second.
    pub fn tick(&mut self) -> TickOutcome {
        match self.remaining {
            None => TickOutcome::Idle,
            Some(0 | 1) => {
                self.remaining = None;
                TickOutcome::Expired
            }
            Some(n) => {
                self.remaining = Some(n - 1);
                TickOutcome::Running(n - 1)
            }
        }
    }
}
