//! # Round Controller
//!
//! Drives one round as a single tokio task. Commands from the player, timer
//! events and completed network calls all arrive on channels and are handled
//! one at a time, so no two events ever mutate the round concurrently.
//!
//! ```text
//!  RoundHandle::send ──► commands ─┐
//!                                  ├──► run loop ──► RoundState / CanvasEngine
//!  Scheduler tasks ──► scheduled ──┘        │
//!    (countdown, reveal, scoring,           └──► broadcast ──► RoundUpdate
//!     leaderboard, redirect)
//! ```
//!
//! The scoring round trip is the only place the round waits on the network.
//! It runs as a scheduler task so the canvas stays editable meanwhile, and the
//! round itself sits in `Submitting` until the response is delivered.
//!
//! A win posts one leaderboard report. Leaving the round after a win waits
//! for that report to settle; only [`RoundCommand::Teardown`] abandons it.

use std::sync::Arc;
use std::time::Duration;

use drawdle_core::{
    Color, DisplayRect, HintToggle, LeaderboardEntry, Mode, Outcome, Phase, Point, PointerPhase,
    RevealCycle, RevealSequencer, RevealStage, RoundState, ScoreRequest, ScoreResponse,
    SessionContext, SessionError, SubmissionResult, Transition, TICK_INTERVAL,
};
use drawdle_renderer::{CanvasEngine, Snapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use uuid::Uuid;

use crate::leaderboard::{LeaderboardError, LeaderboardReporter};
use crate::metrics;
use crate::scheduler::{Scheduled, Scheduler, TaskGroup};
use crate::scoring::{ScoringError, ScoringService};

/// Notice shown when a submission cannot be scored.
pub const SUBMISSION_FAILED: &str = "Submission failed.";

/// Notice shown when the countdown forfeits an attempt.
pub const TIME_UP: &str = "⏰ Time's up! Attempt lost.";

const COMMAND_BUFFER: usize = 64;
const UPDATE_BUFFER: usize = 256;

/// A player action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundCommand {
    /// Pointer event in display coordinates.
    Pointer {
        /// Event phase.
        phase: PointerPhase,
        /// Display-space x.
        #[serde(default)]
        x: f32,
        /// Display-space y.
        #[serde(default)]
        y: f32,
    },
    /// The canvas moved or was resized on screen.
    SetDisplayRect(DisplayRect),
    /// Remove the last stroke.
    Undo,
    /// Remove every stroke.
    Clear,
    /// Pick a brush colour.
    SetColor {
        /// The colour.
        color: Color,
    },
    /// Pick a brush width.
    SetWidth {
        /// Width in backing pixels.
        width: f32,
    },
    /// Turn the eraser on or off.
    SetEraser {
        /// Whether the eraser is active.
        on: bool,
    },
    /// Submit the drawing for scoring.
    Submit,
    /// Open or close the hint panel.
    ToggleHint,
    /// Stop the round and cancel all pending work.
    Teardown,
}

/// Category of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The action was refused by a rule.
    Validation,
    /// The scoring service could not be reached or understood.
    Transport,
    /// The countdown forfeited an attempt.
    Timeout,
    /// A hint request was refused.
    Hint,
}

/// Something the UI should reflect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundUpdate {
    /// The round began.
    Started {
        /// Round id.
        round_id: Uuid,
        /// Difficulty.
        mode: Mode,
        /// First attempt.
        attempt: u32,
    },
    /// The stroke list changed.
    Drawing {
        /// Committed strokes.
        strokes: usize,
        /// Canvas revision.
        revision: u64,
    },
    /// Countdown second elapsed.
    Countdown {
        /// Seconds left.
        remaining: u32,
    },
    /// A submission is in flight.
    Submitting {
        /// Attempt being spent.
        attempt: u32,
    },
    /// The scoring service answered.
    Scored(SubmissionResult),
    /// One part of the latest result may now be shown.
    Reveal {
        /// Reveal cycle.
        cycle: RevealCycle,
        /// Stage to show.
        stage: RevealStage,
    },
    /// Drawing resumed at a new attempt.
    Attempt {
        /// The attempt number.
        attempt: u32,
        /// Attempts left after this one.
        remaining: u32,
    },
    /// The hint panel changed.
    Hint {
        /// What happened.
        toggle: HintToggle,
    },
    /// Message for the player.
    Notice {
        /// Category.
        kind: NoticeKind,
        /// Text.
        message: String,
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
    /// Show the end-of-round dialog.
    ShowOutcome {
        /// How it ended.
        outcome: Outcome,
    },
    /// The controller stopped.
    Closed,
}

/// Delays after a round resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimings {
    /// Resolution to the win dialog.
    pub win_modal: Duration,
    /// Win dialog to leaving the round, or later if the leaderboard report
    /// is still in flight.
    pub win_redirect: Duration,
    /// Loss to leaving the round.
    pub lost_redirect: Duration,
}

impl Default for RoundTimings {
    fn default() -> Self {
        Self {
            win_modal: Duration::from_millis(1200),
            win_redirect: Duration::from_millis(2000),
            lost_redirect: Duration::from_millis(2500),
        }
    }
}

/// Collaborators injected into a round.
pub struct RoundDeps {
    /// Player settings and the daily lock.
    pub session: SessionContext,
    /// Drawing surface.
    pub canvas: CanvasEngine,
    /// Remote judge.
    pub scoring: Arc<dyn ScoringService>,
    /// Winning-score sink.
    pub leaderboard: Arc<dyn LeaderboardReporter>,
    /// Post-resolution delays.
    pub timings: RoundTimings,
}

/// Summary returned when the controller stops.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// Round id.
    pub round_id: Uuid,
    /// Outcome, if the round was resolved.
    pub outcome: Option<Outcome>,
    /// Final score, if the round was resolved.
    pub score: Option<f64>,
    /// Attempt the round stopped at.
    pub attempts: u32,
    /// Failed guesses, newest first.
    pub guess_history: Vec<String>,
    /// Snapshot of the canvas at shutdown.
    pub final_snapshot: Snapshot,
}

#[derive(Debug)]
enum RoundEvent {
    Tick,
    Reveal {
        cycle: RevealCycle,
        stage: RevealStage,
    },
    Scored {
        attempt: u32,
        colour: Color,
        image: Snapshot,
        elapsed: Duration,
        result: Result<ScoreResponse, ScoringError>,
    },
    DailyHint(Option<String>),
    Reported(Result<(), LeaderboardError>),
    ShowOutcome,
    Redirect,
}

/// Handle to a running round.
#[derive(Debug)]
pub struct RoundHandle {
    round_id: Uuid,
    commands: mpsc::Sender<RoundCommand>,
    updates: broadcast::Receiver<RoundUpdate>,
    join: JoinHandle<RoundReport>,
}

impl RoundHandle {
    /// Round id.
    #[must_use]
    pub fn round_id(&self) -> Uuid {
        self.round_id
    }

    /// Queue a command. Returns `false` once the controller has stopped.
    pub async fn send(&self, command: RoundCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// A sender for feeding commands from another task.
    #[must_use]
    pub fn commands(&self) -> mpsc::Sender<RoundCommand> {
        self.commands.clone()
    }

    /// A new receiver for updates sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RoundUpdate> {
        self.updates.resubscribe()
    }

    /// Next update since the round started, `None` once the controller is
    /// gone and every update has been read.
    pub async fn next_update(&mut self) -> Option<RoundUpdate> {
        loop {
            match self.updates.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("round update receiver lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Close the command channel and wait for the controller to stop.
    ///
    /// Closing the channel tears the round down like
    /// [`RoundCommand::Teardown`]; read updates until
    /// [`RoundUpdate::Closed`] first to let a resolved round run out.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller task panicked or was aborted.
    pub async fn join(self) -> Result<RoundReport, JoinError> {
        let Self { commands, join, .. } = self;
        drop(commands);
        join.await
    }
}

/// Progress of the single leaderboard report a win is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportState {
    Unsent,
    InFlight,
    Settled,
}

/// Runs the round rules against the canvas and the remote services.
pub struct RoundController {
    round_id: Uuid,
    session: SessionContext,
    canvas: CanvasEngine,
    scoring: Arc<dyn ScoringService>,
    leaderboard: Arc<dyn LeaderboardReporter>,
    timings: RoundTimings,
    state: RoundState,
    reveal: RevealSequencer,
    scheduler: Scheduler<RoundEvent>,
    updates: broadcast::Sender<RoundUpdate>,
    win_report: ReportState,
    redirect_deferred: bool,
    exit: bool,
}

impl RoundController {
    /// Claim today's round and start the controller task.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Locked`] if today's round was already played,
    /// or a store error if the claim cannot be persisted.
    pub fn start(deps: RoundDeps) -> Result<RoundHandle, SessionError> {
        deps.session.acquire_daily_lock()?;

        let round_id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (update_tx, update_rx) = broadcast::channel(UPDATE_BUFFER);
        let (scheduler, scheduled_rx) = Scheduler::new();

        let controller = Self {
            round_id,
            state: RoundState::new(deps.session.mode),
            session: deps.session,
            canvas: deps.canvas,
            scoring: deps.scoring,
            leaderboard: deps.leaderboard,
            timings: deps.timings,
            reveal: RevealSequencer::new(),
            scheduler,
            updates: update_tx,
            win_report: ReportState::Unsent,
            redirect_deferred: false,
            exit: false,
        };
        let join = tokio::spawn(controller.run(command_rx, scheduled_rx));

        Ok(RoundHandle {
            round_id,
            commands: command_tx,
            updates: update_rx,
            join,
        })
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<RoundCommand>,
        mut scheduled: mpsc::UnboundedReceiver<Scheduled<RoundEvent>>,
    ) -> RoundReport {
        self.begin();

        loop {
            tokio::select! {
                biased;

                Some(event) = scheduled.recv() => {
                    if let Some(event) = self.scheduler.accept(event) {
                        self.handle_event(event);
                    }
                }

                command = commands.recv() => match command {
                    Some(RoundCommand::Teardown) | None => {
                        tracing::debug!(round = %self.round_id, "round torn down");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                },
            }

            if self.exit {
                break;
            }
        }

        if self.win_report == ReportState::InFlight {
            tracing::warn!(round = %self.round_id, "leaderboard report aborted by teardown");
        }
        self.scheduler.cancel_all();
        self.emit(RoundUpdate::Closed);
        self.report()
    }

    fn begin(&mut self) {
        tracing::info!(
            round = %self.round_id,
            player = %self.session.player_name,
            mode = %self.state.mode(),
            date = %self.session.today,
            "round started"
        );
        self.emit(RoundUpdate::Started {
            round_id: self.round_id,
            mode: self.state.mode(),
            attempt: self.state.attempt(),
        });
        metrics::set_attempts_remaining(self.state.attempts_remaining());

        let scoring = Arc::clone(&self.scoring);
        self.scheduler.spawn(TaskGroup::DailyHint, async move {
            match scoring.daily_target().await {
                Ok(target) => RoundEvent::DailyHint(target.usage_hint()),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to fetch daily target");
                    RoundEvent::DailyHint(None)
                }
            }
        });

        self.restart_countdown();
    }

    fn emit(&self, update: RoundUpdate) {
        // No receivers is fine.
        let _ = self.updates.send(update);
    }

    fn notice(&self, kind: NoticeKind, message: impl Into<String>) {
        self.emit(RoundUpdate::Notice {
            kind,
            message: message.into(),
        });
    }

    fn emit_drawing(&self) {
        self.emit(RoundUpdate::Drawing {
            strokes: self.canvas.strokes().len(),
            revision: self.canvas.revision(),
        });
    }

    fn restart_countdown(&mut self) {
        self.scheduler.cancel(TaskGroup::Countdown);
        if let Some(remaining) = self.state.time_remaining() {
            self.emit(RoundUpdate::Countdown { remaining });
            self.scheduler
                .every(TaskGroup::Countdown, TICK_INTERVAL, || RoundEvent::Tick);
        }
    }

    // ---------------------------------------------------------------------
    // Commands

    fn handle_command(&mut self, command: RoundCommand) {
        if self.state.phase().is_terminal() {
            tracing::debug!(?command, "command ignored after resolution");
            return;
        }

        let edited = match command {
            RoundCommand::Pointer { phase, x, y } => {
                self.canvas.handle_pointer(phase, Point::new(x, y))
            }
            RoundCommand::Undo => self.canvas.undo().map(|removed| removed.is_some()),
            RoundCommand::Clear => self.canvas.clear().map(|()| true),
            RoundCommand::SetDisplayRect(rect) => {
                self.canvas.set_display_rect(rect);
                Ok(false)
            }
            RoundCommand::SetColor { color } => {
                self.canvas.set_color(color);
                Ok(false)
            }
            RoundCommand::SetWidth { width } => {
                self.canvas.set_width(width);
                Ok(false)
            }
            RoundCommand::SetEraser { on } => {
                self.canvas.set_eraser(on);
                Ok(false)
            }
            RoundCommand::Submit => {
                self.submit();
                Ok(false)
            }
            RoundCommand::ToggleHint => {
                self.toggle_hint();
                Ok(false)
            }
            RoundCommand::Teardown => Ok(false),
        };

        match edited {
            Ok(true) => self.emit_drawing(),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "canvas update failed"),
        }
    }

    fn submit(&mut self) {
        let attempt = match self.state.begin_submit(self.canvas.has_content()) {
            Ok(Some(attempt)) => attempt,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "submission refused");
                self.notice(NoticeKind::Validation, e.to_string());
                return;
            }
        };

        self.reveal.cancel();
        self.scheduler.cancel(TaskGroup::Reveal);
        self.scheduler.cancel(TaskGroup::Countdown);

        let image = self.canvas.snapshot().clone();
        let colour = self.canvas.brush().color;
        let request = ScoreRequest {
            image_base64: image.data_uri(),
            attempt,
            colour,
        };
        self.emit(RoundUpdate::Submitting { attempt });

        let scoring = Arc::clone(&self.scoring);
        self.scheduler.spawn(TaskGroup::Submission, async move {
            let started = Instant::now();
            let result = scoring.submit(&request).await;
            RoundEvent::Scored {
                attempt,
                colour,
                image,
                elapsed: started.elapsed(),
                result,
            }
        });
    }

    fn toggle_hint(&mut self) {
        match self.state.toggle_hint() {
            Ok(None) => {}
            Ok(Some((toggle, transition))) => {
                if matches!(toggle, HintToggle::Purchased(_)) {
                    metrics::record_hint_purchase();
                }
                self.emit(RoundUpdate::Hint { toggle });
                if let Some(transition) = transition {
                    self.apply_transition(transition, None);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt = self.state.attempt(), "hint refused");
                self.notice(NoticeKind::Hint, e.to_string());
            }
        }
    }

    // ---------------------------------------------------------------------
    // Scheduled events

    fn handle_event(&mut self, event: RoundEvent) {
        match event {
            RoundEvent::Tick => self.on_tick(),
            RoundEvent::Reveal { cycle, stage } => {
                if self.state.phase() != Phase::Submitting && self.reveal.accept(cycle, stage) {
                    self.emit(RoundUpdate::Reveal { cycle, stage });
                }
            }
            RoundEvent::Scored {
                attempt,
                colour,
                image,
                elapsed,
                result,
            } => self.on_scored(attempt, colour, image, elapsed, result),
            RoundEvent::DailyHint(text) => {
                tracing::debug!(available = text.is_some(), "daily hint loaded");
                self.state.set_daily_hint(text);
            }
            RoundEvent::Reported(result) => {
                self.win_report = ReportState::Settled;
                match result {
                    Ok(()) => tracing::debug!("leaderboard report delivered"),
                    Err(e) => tracing::warn!(error = %e, "leaderboard report failed"),
                }
                if self.redirect_deferred {
                    self.exit = true;
                }
            }
            RoundEvent::ShowOutcome => {
                if let Phase::Resolved(outcome) = self.state.phase() {
                    self.emit(RoundUpdate::ShowOutcome { outcome });
                }
            }
            // A winning report still in flight holds the round open until it settles.
            RoundEvent::Redirect if self.win_report == ReportState::InFlight => {
                tracing::debug!("redirect waiting for leaderboard report");
                self.redirect_deferred = true;
            }
            RoundEvent::Redirect => self.exit = true,
        }
    }

    fn on_tick(&mut self) {
        let hint_was_open = self.state.hints().displayed().is_some();
        let attempt = self.state.attempt();
        match self.state.tick() {
            Some(transition) => {
                tracing::info!(attempt, "attempt forfeited to the countdown");
                metrics::record_timeout();
                if hint_was_open {
                    self.emit(RoundUpdate::Hint {
                        toggle: HintToggle::Hidden,
                    });
                }
                self.notice(NoticeKind::Timeout, TIME_UP);
                self.apply_transition(transition, None);
            }
            None => {
                if let Some(remaining) = self.state.time_remaining() {
                    self.emit(RoundUpdate::Countdown { remaining });
                }
            }
        }
    }

    fn on_scored(
        &mut self,
        attempt: u32,
        colour: Color,
        image: Snapshot,
        elapsed: Duration,
        result: Result<ScoreResponse, ScoringError>,
    ) {
        let secs = elapsed.as_secs_f64();
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, attempt, "submission failed");
                metrics::record_submission_failure(failure_reason(&e), secs);
                self.state.rollback();
                self.notice(NoticeKind::Transport, SUBMISSION_FAILED);
                self.restart_countdown();
                return;
            }
        };

        metrics::record_submission(attempt, secs);
        let result = response.resolve(attempt, colour);
        tracing::debug!(
            attempt,
            success = result.success,
            guess = %result.guess,
            score = result.score,
            "submission scored"
        );
        self.emit(RoundUpdate::Scored(result.clone()));

        let Some(transition) = self.state.apply_result(result) else {
            return;
        };

        let cycle = self.reveal.begin();
        for stage in RevealStage::ALL {
            self.scheduler.after(
                TaskGroup::Reveal,
                stage.delay(),
                RoundEvent::Reveal { cycle, stage },
            );
        }

        self.apply_transition(transition, Some(image));
    }

    fn apply_transition(&mut self, transition: Transition, image: Option<Snapshot>) {
        match transition {
            Transition::NextAttempt { attempt } => {
                let remaining = self.state.attempts_remaining();
                metrics::set_attempts_remaining(remaining);
                self.emit(RoundUpdate::Attempt { attempt, remaining });
                self.restart_countdown();
            }
            Transition::Resolved {
                outcome,
                score,
                attempts,
            } => self.finish(outcome, score, attempts, image),
        }
    }

    fn finish(&mut self, outcome: Outcome, score: f64, attempts: u32, image: Option<Snapshot>) {
        self.scheduler.cancel(TaskGroup::Countdown);
        if let Err(e) = self.session.mark_finished() {
            tracing::warn!(error = %e, "failed to record finished round");
        }
        metrics::record_round_resolved(outcome);
        metrics::set_attempts_remaining(0);
        self.emit(RoundUpdate::Resolved {
            outcome,
            score,
            attempts,
        });

        match outcome {
            Outcome::Won => {
                if let Some(image) = image {
                    self.report_win(score, attempts, &image);
                }
                self.scheduler.after(
                    TaskGroup::Redirect,
                    self.timings.win_modal,
                    RoundEvent::ShowOutcome,
                );
                self.scheduler.after(
                    TaskGroup::Redirect,
                    self.timings.win_modal + self.timings.win_redirect,
                    RoundEvent::Redirect,
                );
            }
            Outcome::Lost => {
                self.scheduler.after(
                    TaskGroup::Redirect,
                    self.timings.lost_redirect,
                    RoundEvent::Redirect,
                );
            }
        }
    }

    fn report_win(&mut self, score: f64, attempts: u32, image: &Snapshot) {
        if self.win_report != ReportState::Unsent {
            return;
        }
        self.win_report = ReportState::InFlight;

        let entry = LeaderboardEntry::new(
            self.session.player_name.clone(),
            score,
            attempts,
            image.data_uri(),
        );
        let leaderboard = Arc::clone(&self.leaderboard);
        self.scheduler.spawn(TaskGroup::Report, async move {
            RoundEvent::Reported(leaderboard.report(&entry).await)
        });
    }

    fn report(&self) -> RoundReport {
        let outcome = match self.state.phase() {
            Phase::Resolved(outcome) => Some(outcome),
            Phase::Drawing | Phase::Submitting => None,
        };
        RoundReport {
            round_id: self.round_id,
            outcome,
            score: self.state.final_score(),
            attempts: self.state.attempt(),
            guess_history: self.state.guess_history().map(str::to_string).collect(),
            final_snapshot: self.canvas.snapshot().clone(),
        }
    }
}

fn failure_reason(error: &ScoringError) -> &'static str {
    match error {
        ScoringError::InvalidUrl(_) => "url",
        ScoringError::Http(_) => "http",
        ScoringError::Status { .. } => "status",
        ScoringError::Json(_) => "json",
    }
}
