//! Round metrics.
//!
//! Thin wrappers over the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder; without one every call is a
//! no-op.

use drawdle_core::Outcome;
use metrics::{counter, gauge, histogram};

const SUBMISSIONS_TOTAL: &str = "drawdle_submissions_total";
const SUBMISSION_FAILURES_TOTAL: &str = "drawdle_submission_failures_total";
const SCORING_REQUEST_DURATION: &str = "drawdle_scoring_request_duration_seconds";
const TIMEOUTS_TOTAL: &str = "drawdle_timeouts_total";
const HINT_PURCHASES_TOTAL: &str = "drawdle_hint_purchases_total";
const ROUNDS_RESOLVED_TOTAL: &str = "drawdle_rounds_resolved_total";
const ATTEMPTS_REMAINING: &str = "drawdle_attempts_remaining";

/// Record a scoring request that produced a parsed response.
pub fn record_submission(attempt: u32, duration_secs: f64) {
    counter!(SUBMISSIONS_TOTAL, "attempt" => attempt.to_string()).increment(1);
    histogram!(SCORING_REQUEST_DURATION).record(duration_secs);
}

/// Record a scoring request that failed in transport or parsing.
///
/// # Arguments
///
/// * `reason` - "http", "status", "json" or "url"
pub fn record_submission_failure(reason: &str, duration_secs: f64) {
    counter!(SUBMISSION_FAILURES_TOTAL, "reason" => reason.to_string()).increment(1);
    histogram!(SCORING_REQUEST_DURATION).record(duration_secs);
}

/// Record an attempt forfeited to the countdown.
pub fn record_timeout() {
    counter!(TIMEOUTS_TOTAL).increment(1);
}

/// Record an attempt spent on a hint.
pub fn record_hint_purchase() {
    counter!(HINT_PURCHASES_TOTAL).increment(1);
}

/// Record a round reaching a terminal phase.
pub fn record_round_resolved(outcome: Outcome) {
    let label = match outcome {
        Outcome::Won => "won",
        Outcome::Lost => "lost",
    };
    counter!(ROUNDS_RESOLVED_TOTAL, "outcome" => label).increment(1);
}

/// Update the attempts-remaining gauge.
pub fn set_attempts_remaining(remaining: u32) {
    gauge!(ATTEMPTS_REMAINING).set(f64::from(remaining));
}
