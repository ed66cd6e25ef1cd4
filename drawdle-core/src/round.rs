//! Round state machine.
//!
//! ```text
//!            submit()                 response: success
//!  Drawing(n) ───────► Submitting ─────────────────────► Resolved(won)
//!      ▲                   │  │     response: fail, n = MAX
//!      │ transport error   │  └────────────────────────► Resolved(lost)
//!      └───────────────────┘
//!      │                   response: fail, n < MAX
//!      └──────────────────────────────────────────────► Drawing(n + 1)
//!
//!  Drawing(n) ── timeout / hint purchase ──► Drawing(n + 1) | Resolved(lost)
//! ```
//!
//! The countdown runs iff the mode is hard and the phase is `Drawing`.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    CoreError, CoreResult, Countdown, HintEconomy, HintToggle, SubmissionResult, TickOutcome,
};

/// Attempts per round.
pub const MAX_ATTEMPTS: u32 = 5;

/// Failed guesses kept in the history.
pub const GUESS_HISTORY_LEN: usize = 5;

/// Difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// No time limit.
    #[default]
    Easy,
    /// Each attempt has a countdown.
    Hard,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Hard => "hard",
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The service guessed the drawing.
    Won,
    /// All attempts were used.
    Lost,
}

/// Where the round is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "outcome", rename_all = "lowercase")]
pub enum Phase {
    /// The player is drawing.
    Drawing,
    /// A submission is in flight.
    Submitting,
    /// The round is over.
    Resolved(Outcome),
}

impl Phase {
    /// Whether the round is over.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// A change of attempt or phase caused by a result, timeout or purchase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transition {
    /// Back to drawing at the given attempt.
    NextAttempt {
        /// The new attempt number.
        attempt: u32,
    },
    /// The round ended.
    Resolved {
        /// How it ended.
        outcome: Outcome,
        /// Final score.
        score: f64,
        /// Attempt it ended at.
        attempts: u32,
    },
}

/// Everything the controller knows about a round.
#[derive(Debug, Clone)]
pub struct RoundState {
    attempt: u32,
    mode: Mode,
    phase: Phase,
    countdown: Countdown,
    hints: HintEconomy,
    last_result: Option<SubmissionResult>,
    guess_history: VecDeque<String>,
    final_score: Option<f64>,
}

impl RoundState {
    /// Start a round at attempt 1.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        let mut state = Self {
            attempt: 1,
            mode,
            phase: Phase::Drawing,
            countdown: Countdown::stopped(),
            hints: HintEconomy::new(),
            last_result: None,
            guess_history: VecDeque::with_capacity(GUESS_HISTORY_LEN),
            final_score: None,
        };
        state.enter_drawing();
        state
    }

    /// Current attempt number (1-based).
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempts left after the current one.
    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        MAX_ATTEMPTS.saturating_sub(self.attempt)
    }

    /// Difficulty.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Countdown seconds, defined only in hard mode while drawing.
    #[must_use]
    pub fn time_remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    /// Hint state.
    #[must_use]
    pub fn hints(&self) -> &HintEconomy {
        &self.hints
    }

    /// Set the daily target hint.
    pub fn set_daily_hint(&mut self, text: Option<String>) {
        self.hints.set_daily(text);
    }

    /// The most recent resolved submission.
    #[must_use]
    pub fn last_result(&self) -> Option<&SubmissionResult> {
        self.last_result.as_ref()
    }

    /// Failed guesses, newest first.
    pub fn guess_history(&self) -> impl Iterator<Item = &str> {
        self.guess_history.iter().map(String::as_str)
    }

    /// Final score once resolved.
    #[must_use]
    pub fn final_score(&self) -> Option<f64> {
        self.final_score
    }

    fn enter_drawing(&mut self) {
        self.phase = Phase::Drawing;
        if self.mode == Mode::Hard {
            self.countdown.reset();
        } else {
            self.countdown.stop();
        }
    }

    fn resolve(&mut self, outcome: Outcome, score: f64) -> Transition {
        self.phase = Phase::Resolved(outcome);
        self.countdown.stop();
        self.final_score = Some(score);
        tracing::info!(?outcome, score, attempt = self.attempt, "round resolved");
        Transition::Resolved {
            outcome,
            score,
            attempts: self.attempt,
        }
    }

    fn consume_attempt(&mut self, lost_score: f64) -> Transition {
        if self.attempt >= MAX_ATTEMPTS {
            return self.resolve(Outcome::Lost, lost_score);
        }
        self.attempt += 1;
        self.enter_drawing();
        tracing::debug!(attempt = self.attempt, "next attempt");
        Transition::NextAttempt {
            attempt: self.attempt,
        }
    }

    /// Begin a submission.
    ///
    /// Returns `Ok(None)` when the phase is not `Drawing` (the request is
    /// ignored), or `Ok(Some(attempt))` with the attempt being spent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyDrawing`] if `has_content` is false.
    pub fn begin_submit(&mut self, has_content: bool) -> CoreResult<Option<u32>> {
        if self.phase != Phase::Drawing {
            tracing::debug!(phase = ?self.phase, "submit ignored");
            return Ok(None);
        }
        if !has_content {
            return Err(CoreError::EmptyDrawing);
        }
        self.phase = Phase::Submitting;
        self.countdown.stop();
        tracing::debug!(attempt = self.attempt, "submitting");
        Ok(Some(self.attempt))
    }

    /// Apply a parsed response to the submission in flight.
    ///
    /// Returns `None` if no submission is in flight.
    pub fn apply_result(&mut self, result: SubmissionResult) -> Option<Transition> {
        if self.phase != Phase::Submitting {
            tracing::warn!(phase = ?self.phase, "result arrived outside a submission");
            return None;
        }
        let score = result.score;
        let transition = if result.success {
            self.resolve(Outcome::Won, score)
        } else {
            if result.has_guess() {
                self.guess_history.push_front(result.guess.clone());
                self.guess_history.truncate(GUESS_HISTORY_LEN);
            }
            self.hints.offer(result.hint_text());
            self.consume_attempt(score)
        };
        self.last_result = Some(result);
        Some(transition)
    }

    /// Return to drawing at the same attempt after a transport failure.
    pub fn rollback(&mut self) {
        if self.phase == Phase::Submitting {
            tracing::debug!(attempt = self.attempt, "submission rolled back");
            self.enter_drawing();
        }
    }

    /// Advance the countdown by one second.
    ///
    /// On expiry the attempt is forfeited and the hint panel closed.
    /// Returns the forfeit transition, if any.
    pub fn tick(&mut self) -> Option<Transition> {
        if self.phase != Phase::Drawing {
            return None;
        }
        match self.countdown.tick() {
            TickOutcome::Idle | TickOutcome::Running(_) => None,
            TickOutcome::Expired => {
                tracing::debug!(attempt = self.attempt, "attempt timed out");
                self.hints.close();
                Some(self.consume_attempt(0.0))
            }
        }
    }

    /// Toggle the hint panel.
    ///
    /// Returns `Ok(None)` outside `Drawing`. A purchase spends the current
    /// attempt and returns the resulting transition alongside.
    ///
    /// # Errors
    ///
    /// Propagates refusals from [`HintEconomy::toggle`].
    pub fn toggle_hint(&mut self) -> CoreResult<Option<(HintToggle, Option<Transition>)>> {
        if self.phase != Phase::Drawing {
            return Ok(None);
        }
        let toggle = self.hints.toggle(self.attempt)?;
        let transition = match toggle {
            HintToggle::Purchased(_) => {
                self.attempt += 1;
                self.enter_drawing();
                tracing::debug!(attempt = self.attempt, "hint purchased");
                Some(Transition::NextAttempt {
                    attempt: self.attempt,
                })
            }
            HintToggle::Hidden | HintToggle::Reshown(_) => None,
        };
        Ok(Some((toggle, transition)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, ScoreResponse};

    fn failed(attempt: u32, guess: &str) -> SubmissionResult {
        ScoreResponse {
            success: Some(false),
            guess: Some(guess.to_string()),
            hint: Some(format!("hint {attempt}")),
            ..ScoreResponse::default()
        }
        .resolve(attempt, Color::BLACK)
    }

    fn won(attempt: u32) -> SubmissionResult {
        ScoreResponse {
            success: Some(true),
            score: Some(88.0),
            ..ScoreResponse::default()
        }
        .resolve(attempt, Color::BLACK)
    }

    #[test]
    fn test_new_round() {
        let easy = RoundState::new(Mode::Easy);
        assert_eq!(easy.attempt(), 1);
        assert_eq!(easy.phase(), Phase::Drawing);
        assert_eq!(easy.time_remaining(), None);

        let hard = RoundState::new(Mode::Hard);
        assert_eq!(hard.time_remaining(), Some(10));
    }

    #[test]
    fn test_empty_submit_refused() {
        let mut state = RoundState::new(Mode::Easy);
        assert!(matches!(state.begin_submit(false), Err(CoreError::EmptyDrawing)));
        assert_eq!(state.phase(), Phase::Drawing);
    }

    #[test]
    fn test_double_submit_ignored() {
        let mut state = RoundState::new(Mode::Hard);
        assert_eq!(state.begin_submit(true).expect("submit"), Some(1));
        assert_eq!(state.time_remaining(), None);
        assert_eq!(state.begin_submit(true).expect("ignored"), None);
        assert_eq!(state.tick(), None);
    }

    #[test]
    fn test_failed_result_advances() {
        let mut state = RoundState::new(Mode::Hard);
        state.begin_submit(true).expect("submit");
        let transition = state.apply_result(failed(1, "cat"));
        assert_eq!(transition, Some(Transition::NextAttempt { attempt: 2 }));
        assert_eq!(state.phase(), Phase::Drawing);
        assert_eq!(state.time_remaining(), Some(10));
        assert_eq!(state.hints().newest(), Some("hint 1"));
        assert_eq!(state.guess_history().collect::<Vec<_>>(), vec!["cat"]);
    }

    #[test]
    fn test_fail_at_last_attempt_loses_with_score() {
        let mut state = RoundState::new(Mode::Easy);
        for attempt in 1..MAX_ATTEMPTS {
            state.begin_submit(true).expect("submit");
            state.apply_result(failed(attempt, "dog"));
        }
        state.begin_submit(true).expect("submit");
        let transition = state.apply_result(failed(MAX_ATTEMPTS, "dog")).expect("transition");
        // 50 - 10 * 4
        assert_eq!(
            transition,
            Transition::Resolved {
                outcome: Outcome::Lost,
                score: 10.0,
                attempts: MAX_ATTEMPTS
            }
        );
        assert!(state.phase().is_terminal());
        assert_eq!(state.guess_history().count(), GUESS_HISTORY_LEN);
    }

    #[test]
    fn test_win_resolves() {
        let mut state = RoundState::new(Mode::Easy);
        state.begin_submit(true).expect("submit");
        let transition = state.apply_result(won(1)).expect("transition");
        assert!(matches!(
            transition,
            Transition::Resolved {
                outcome: Outcome::Won,
                ..
            }
        ));
        assert_eq!(state.final_score(), Some(88.0));
        assert!(state.apply_result(won(1)).is_none());
    }

    #[test]
    fn test_rollback_keeps_attempt() {
        let mut state = RoundState::new(Mode::Hard);
        state.begin_submit(true).expect("submit");
        state.rollback();
        assert_eq!(state.attempt(), 1);
        assert_eq!(state.phase(), Phase::Drawing);
        assert_eq!(state.time_remaining(), Some(10));
    }

    #[test]
    fn test_timeout_forfeits_attempt() {
        let mut state = RoundState::new(Mode::Hard);
        for _ in 0..9 {
            assert_eq!(state.tick(), None);
        }
        assert_eq!(state.tick(), Some(Transition::NextAttempt { attempt: 2 }));
        assert_eq!(state.time_remaining(), Some(10));
    }

    #[test]
    fn test_hint_purchase_spends_attempt() {
        let mut state = RoundState::new(Mode::Easy);
        state.set_daily_hint(Some("Found in kitchens".to_string()));
        let (toggle, transition) = state.toggle_hint().expect("toggle").expect("drawing");
        assert!(matches!(toggle, HintToggle::Purchased(_)));
        assert_eq!(transition, Some(Transition::NextAttempt { attempt: 2 }));

        let (hidden, none) = state.toggle_hint().expect("toggle").expect("drawing");
        assert_eq!(hidden, HintToggle::Hidden);
        assert!(none.is_none());
        assert_eq!(state.attempt(), 2);
    }

    #[test]
    fn test_hint_ignored_while_submitting() {
        let mut state = RoundState::new(Mode::Easy);
        state.set_daily_hint(Some("Found in kitchens".to_string()));
        state.begin_submit(true).expect("submit");
        assert!(state.toggle_hint().expect("toggle").is_none());
        assert_eq!(state.attempt(), 1);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("hard".parse::<Mode>(), Ok(Mode::Hard));
        assert!("medium".parse::<Mode>().is_err());
        assert_eq!(Mode::Easy.to_string(), "easy");
    }
}
