//! End-to-end round flows through the controller task.
//!
//! The scoring service and leaderboard are in-process fakes; time is paused so
//! countdowns, reveal stages and redirects run instantly and deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use drawdle_client::{
    LeaderboardError, LeaderboardReporter, NoticeKind, RoundCommand, RoundController, RoundDeps,
    RoundHandle, RoundTimings, RoundUpdate, ScoringError, ScoringService,
};
use drawdle_core::session::{iso_date, ACTIVE_PLAY_DATE, LAST_PLAY_DATE};
use drawdle_core::{
    FileStore, HintToggle, KeyValueStore, LeaderboardEntry, MemoryStore, Mode, Outcome, PointerPhase,
    RevealStage, ScoreRequest, ScoreResponse, SessionContext, SessionError, TargetRecord,
};
use drawdle_renderer::{CanvasConfig, CanvasEngine};
use tokio::time::Instant;

// ============================================================================
// Fakes
// ============================================================================

enum Reply {
    Scored(ScoreResponse),
    Status(u16),
}

struct FakeScoring {
    calls: AtomicUsize,
    requests: Mutex<Vec<ScoreRequest>>,
    replies: Mutex<VecDeque<Reply>>,
    latency: Duration,
}

impl FakeScoring {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Self::with_latency(replies, Duration::from_millis(100))
    }

    fn with_latency(replies: Vec<Reply>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
            latency,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringService for FakeScoring {
    async fn submit(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());
        tokio::time::sleep(self.latency).await;
        let reply = self
            .replies
            .lock()
            .expect("lock")
            .pop_front()
            .expect("unexpected submission");
        match reply {
            Reply::Scored(response) => Ok(response),
            Reply::Status(status) => Err(ScoringError::Status { status }),
        }
    }

    async fn daily_target(&self) -> Result<TargetRecord, ScoringError> {
        Ok(TargetRecord {
            use_for: Some("Keeps you dry".into()),
            ..TargetRecord::default()
        })
    }
}

#[derive(Default)]
struct FakeLeaderboard {
    started: AtomicUsize,
    entries: Mutex<Vec<LeaderboardEntry>>,
    latency: Duration,
}

impl FakeLeaderboard {
    fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }
}

#[async_trait]
impl LeaderboardReporter for FakeLeaderboard {
    async fn report(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.entries.lock().expect("lock").push(entry.clone());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("date")
}

fn session(store: &Arc<MemoryStore>, mode: Mode) -> SessionContext {
    let mut session = SessionContext::load(Arc::clone(store) as Arc<dyn KeyValueStore>, today());
    session.set_player_name("Ada").expect("name");
    session.set_mode(mode).expect("mode");
    session
}

fn start(
    store: &Arc<MemoryStore>,
    mode: Mode,
    scoring: &Arc<FakeScoring>,
    leaderboard: &Arc<FakeLeaderboard>,
) -> Result<RoundHandle, SessionError> {
    let canvas = CanvasEngine::new(CanvasConfig {
        width: 64,
        height: 48,
        ..CanvasConfig::default()
    })
    .expect("canvas");
    RoundController::start(RoundDeps {
        session: session(store, mode),
        canvas,
        scoring: Arc::clone(scoring) as Arc<dyn ScoringService>,
        leaderboard: Arc::clone(leaderboard) as Arc<dyn LeaderboardReporter>,
        timings: RoundTimings::default(),
    })
}

fn failed(guess: &str, hint: &str) -> Reply {
    Reply::Scored(ScoreResponse {
        success: Some(false),
        guess: Some(guess.into()),
        hint: Some(hint.into()),
        ..ScoreResponse::default()
    })
}

fn won(score: f64) -> Reply {
    Reply::Scored(ScoreResponse {
        success: Some(true),
        guess: Some("umbrella".into()),
        score: Some(score),
        ..ScoreResponse::default()
    })
}

async fn tap(handle: &RoundHandle, x: f32, y: f32) {
    assert!(
        handle
            .send(RoundCommand::Pointer {
                phase: PointerPhase::Down,
                x,
                y
            })
            .await
    );
    assert!(
        handle
            .send(RoundCommand::Pointer {
                phase: PointerPhase::Up,
                x,
                y
            })
            .await
    );
}

/// Read updates until one matches `stop`, returning everything read.
async fn read_until(
    handle: &mut RoundHandle,
    stop: impl Fn(&RoundUpdate) -> bool,
) -> Vec<RoundUpdate> {
    let mut seen = Vec::new();
    while let Some(update) = handle.next_update().await {
        let done = stop(&update);
        seen.push(update);
        if done {
            return seen;
        }
    }
    panic!("controller closed before the expected update; saw {seen:?}");
}

fn is_closed(update: &RoundUpdate) -> bool {
    matches!(update, RoundUpdate::Closed)
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_empty_submit_never_contacts_scoring() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(Vec::new());
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let mut handle = start(&store, Mode::Easy, &scoring, &leaderboard).expect("start");

    handle.send(RoundCommand::Submit).await;
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Notice { .. })).await;
    assert!(matches!(
        seen.last(),
        Some(RoundUpdate::Notice { kind: NoticeKind::Validation, message }) if message == "Draw something first!"
    ));
    assert!(!seen
        .iter()
        .any(|u| matches!(u, RoundUpdate::Submitting { .. })));

    handle.send(RoundCommand::Teardown).await;
    let report = handle.join().await.expect("join");
    assert_eq!(scoring.calls(), 0);
    assert_eq!(report.outcome, None);
    assert_eq!(report.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_locked_day_refuses_to_start() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(LAST_PLAY_DATE, &iso_date(today()))
        .expect("seed lock");
    let scoring = FakeScoring::new(Vec::new());
    let leaderboard = Arc::new(FakeLeaderboard::default());

    let result = start(&store, Mode::Easy, &scoring, &leaderboard);
    assert!(matches!(result, Err(SessionError::Locked(day)) if day == today()));
}

// ============================================================================
// Hard-mode countdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_five_timeouts_lose_with_zero_and_no_scoring_calls() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(Vec::new());
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let started = Instant::now();
    let mut handle = start(&store, Mode::Hard, &scoring, &leaderboard).expect("start");

    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Resolved { .. })).await;
    let timeouts = seen
        .iter()
        .filter(|u| matches!(u, RoundUpdate::Notice { kind: NoticeKind::Timeout, .. }))
        .count();
    assert_eq!(timeouts, 5);
    assert_eq!(
        seen.last(),
        Some(&RoundUpdate::Resolved {
            outcome: Outcome::Lost,
            score: 0.0,
            attempts: 5
        })
    );
    assert!(started.elapsed() >= Duration::from_secs(50));

    read_until(&mut handle, is_closed).await;
    let report = handle.join().await.expect("join");
    assert_eq!(report.outcome, Some(Outcome::Lost));
    assert_eq!(scoring.calls(), 0);
    assert!(leaderboard.entries.lock().expect("lock").is_empty());
    assert_eq!(store.get(LAST_PLAY_DATE), Some(iso_date(today())));
    assert_eq!(store.get(ACTIVE_PLAY_DATE), None);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_keeps_the_attempt() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(vec![Reply::Status(503), failed("kettle", "Boils water")]);
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let mut handle = start(&store, Mode::Hard, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Notice { .. })).await;
    assert!(matches!(
        seen.last(),
        Some(RoundUpdate::Notice { kind: NoticeKind::Transport, message }) if message == "Submission failed."
    ));
    assert!(!seen.iter().any(|u| matches!(u, RoundUpdate::Attempt { .. })));

    // The countdown starts over at the same attempt.
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Countdown { .. })).await;
    assert_eq!(seen.last(), Some(&RoundUpdate::Countdown { remaining: 10 }));

    handle.send(RoundCommand::Submit).await;
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Attempt { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&RoundUpdate::Attempt {
            attempt: 2,
            remaining: 3
        })
    );

    let attempts: Vec<u32> = scoring
        .requests
        .lock()
        .expect("lock")
        .iter()
        .map(|r| r.attempt)
        .collect();
    assert_eq!(attempts, vec![1, 1]);

    handle.send(RoundCommand::Teardown).await;
    let report = handle.join().await.expect("join");
    assert_eq!(report.guess_history, vec!["kettle".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_submission_outlasts_countdown_without_losing_an_attempt() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::with_latency(
        vec![failed("kettle", "Boils water")],
        Duration::from_secs(25),
    );
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let started = Instant::now();
    let mut handle = start(&store, Mode::Hard, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, |u| matches!(u, RoundUpdate::Submitting { .. })).await;
    // A second submit while the first is in flight is ignored.
    handle.send(RoundCommand::Submit).await;

    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Attempt { .. })).await;
    assert!(started.elapsed() >= Duration::from_secs(25));
    assert!(!seen.iter().any(|u| matches!(
        u,
        RoundUpdate::Notice {
            kind: NoticeKind::Timeout,
            ..
        } | RoundUpdate::Submitting { .. }
    )));
    assert_eq!(
        seen.last(),
        Some(&RoundUpdate::Attempt {
            attempt: 2,
            remaining: 3
        })
    );
    assert_eq!(scoring.calls(), 1);

    handle.send(RoundCommand::Teardown).await;
    let report = handle.join().await.expect("join");
    assert_eq!(report.attempts, 2);
    assert_eq!(report.outcome, None);
}

// ============================================================================
// Winning
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_win_reports_once_and_drops_stale_reveal() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(vec![failed("kettle", "Boils water"), won(90.0)]);
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let mut handle = start(&store, Mode::Easy, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, |u| matches!(u, RoundUpdate::Attempt { attempt: 2, .. })).await;

    // Resubmit before the first reveal cycle has shown anything.
    tap(&handle, 30.0, 20.0).await;
    handle.send(RoundCommand::Submit).await;
    let seen = read_until(&mut handle, is_closed).await;

    let resolved: Vec<_> = seen
        .iter()
        .filter(|u| matches!(u, RoundUpdate::Resolved { .. }))
        .collect();
    assert_eq!(
        resolved,
        vec![&RoundUpdate::Resolved {
            outcome: Outcome::Won,
            score: 90.0,
            attempts: 2
        }]
    );
    assert!(seen.contains(&RoundUpdate::ShowOutcome {
        outcome: Outcome::Won
    }));

    let reveals: Vec<_> = seen
        .iter()
        .filter_map(|u| match u {
            RoundUpdate::Reveal { cycle, stage } => Some((*cycle, *stage)),
            _ => None,
        })
        .collect();
    assert_eq!(reveals.len(), 3);
    assert!(reveals.iter().all(|(cycle, _)| *cycle == reveals[0].0));
    assert_eq!(
        reveals.iter().map(|(_, s)| *s).collect::<Vec<_>>(),
        RevealStage::ALL.to_vec()
    );

    let report = handle.join().await.expect("join");
    assert_eq!(report.outcome, Some(Outcome::Won));
    assert_eq!(report.score, Some(90.0));

    let entries = leaderboard.entries.lock().expect("lock");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Ada");
    assert_eq!(entries[0].score, 90);
    assert_eq!(entries[0].attempts, 2);
    assert!(entries[0].image.starts_with("data:image/png;base64,"));
}

#[tokio::test(start_paused = true)]
async fn test_redirect_waits_for_slow_leaderboard_report() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(vec![won(80.0)]);
    let leaderboard = FakeLeaderboard::slow(Duration::from_secs(5));
    let mut handle = start(&store, Mode::Easy, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, |u| matches!(u, RoundUpdate::Resolved { .. })).await;
    let resolved_at = Instant::now();

    let seen = read_until(&mut handle, is_closed).await;
    assert!(seen.contains(&RoundUpdate::ShowOutcome {
        outcome: Outcome::Won
    }));
    assert!(resolved_at.elapsed() >= Duration::from_secs(5));
    handle.join().await.expect("join");

    assert_eq!(leaderboard.started.load(Ordering::SeqCst), 1);
    let entries = leaderboard.entries.lock().expect("lock");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].score, 80);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_aborts_pending_leaderboard_report() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(vec![won(80.0)]);
    let leaderboard = FakeLeaderboard::slow(Duration::from_secs(5));
    let mut handle = start(&store, Mode::Easy, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, |u| matches!(u, RoundUpdate::Resolved { .. })).await;
    handle.send(RoundCommand::Teardown).await;
    read_until(&mut handle, is_closed).await;
    handle.join().await.expect("join");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(leaderboard.entries.lock().expect("lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_commands_after_resolution_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(vec![won(100.0)]);
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let mut handle = start(&store, Mode::Easy, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, |u| matches!(u, RoundUpdate::Resolved { .. })).await;

    handle.send(RoundCommand::Submit).await;
    handle.send(RoundCommand::Undo).await;
    let seen = read_until(&mut handle, is_closed).await;
    assert!(!seen.iter().any(|u| matches!(
        u,
        RoundUpdate::Submitting { .. } | RoundUpdate::Drawing { .. }
    )));
    assert_eq!(scoring.calls(), 1);
}

// ============================================================================
// Hints
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_hint_purchase_costs_an_attempt_then_reshows_free() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(Vec::new());
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let mut handle = start(&store, Mode::Easy, &scoring, &leaderboard).expect("start");
    // Let the daily target load.
    tokio::time::sleep(Duration::from_millis(10)).await;

    handle.send(RoundCommand::ToggleHint).await;
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Attempt { .. })).await;
    assert!(seen.contains(&RoundUpdate::Hint {
        toggle: HintToggle::Purchased("Keeps you dry".into())
    }));
    assert!(seen.contains(&RoundUpdate::Attempt {
        attempt: 2,
        remaining: 3
    }));

    handle.send(RoundCommand::ToggleHint).await;
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Hint { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&RoundUpdate::Hint {
            toggle: HintToggle::Hidden
        })
    );

    handle.send(RoundCommand::ToggleHint).await;
    let seen = read_until(&mut handle, |u| matches!(u, RoundUpdate::Hint { .. })).await;
    assert_eq!(
        seen.last(),
        Some(&RoundUpdate::Hint {
            toggle: HintToggle::Reshown("Keeps you dry".into())
        })
    );

    handle.send(RoundCommand::Teardown).await;
    let report = handle.join().await.expect("join");
    assert_eq!(report.attempts, 2);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_in_flight_submission() {
    let store = Arc::new(MemoryStore::new());
    let scoring = FakeScoring::new(vec![won(100.0)]);
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let mut handle = start(&store, Mode::Hard, &scoring, &leaderboard).expect("start");

    tap(&handle, 10.0, 10.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, |u| matches!(u, RoundUpdate::Submitting { .. })).await;
    handle.send(RoundCommand::Teardown).await;
    let seen = read_until(&mut handle, is_closed).await;
    assert!(!seen
        .iter()
        .any(|u| matches!(u, RoundUpdate::Scored(_) | RoundUpdate::Resolved { .. })));

    let report = handle.join().await.expect("join");
    assert_eq!(report.outcome, None);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(leaderboard.entries.lock().expect("lock").is_empty());
    assert_eq!(store.get(ACTIVE_PLAY_DATE), Some(iso_date(today())));
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_finished_round_locks_the_day_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scoring = FakeScoring::new(vec![won(75.0)]);
    let leaderboard = Arc::new(FakeLeaderboard::default());
    let canvas = || {
        CanvasEngine::new(CanvasConfig {
            width: 64,
            height: 48,
            ..CanvasConfig::default()
        })
        .expect("canvas")
    };
    let open = || {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).expect("store"));
        SessionContext::load(store, today())
    };

    let mut handle = RoundController::start(RoundDeps {
        session: open(),
        canvas: canvas(),
        scoring: Arc::clone(&scoring) as Arc<dyn ScoringService>,
        leaderboard: Arc::clone(&leaderboard) as Arc<dyn LeaderboardReporter>,
        timings: RoundTimings::default(),
    })
    .expect("start");
    tap(&handle, 5.0, 5.0).await;
    handle.send(RoundCommand::Submit).await;
    read_until(&mut handle, is_closed).await;
    handle.join().await.expect("join");

    let again = RoundController::start(RoundDeps {
        session: open(),
        canvas: canvas(),
        scoring: Arc::clone(&scoring) as Arc<dyn ScoringService>,
        leaderboard: Arc::clone(&leaderboard) as Arc<dyn LeaderboardReporter>,
        timings: RoundTimings::default(),
    });
    assert!(matches!(again, Err(SessionError::Locked(_))));
}
