//! Scoring wire types and the local score formula.
//!
//! The scoring service is opaque: it receives a rasterized snapshot and
//! answers with match flags, a guess and optional hint text. Everything the
//! service leaves out falls back to a documented default here, so a sparse
//! response still produces a complete [`SubmissionResult`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::{colour_label, Color};

/// Base score before bonuses and penalties.
pub const BASE_SCORE: f64 = 50.0;

/// Bonus for each of a colour match and a shape match.
pub const MATCH_BONUS: f64 = 20.0;

/// Upper bound on the style bonus.
pub const STYLE_BONUS_CAP: f64 = 25.0;

/// Penalty for each attempt already used.
pub const ATTEMPT_PENALTY: f64 = 10.0;

/// First attempt number at which the location detail is disclosed.
pub const LOCATION_HINT_FROM_ATTEMPT: u32 = 3;

/// Body of `POST /submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// Snapshot as a `data:` URI.
    pub image_base64: String,
    /// Attempt number being spent (1-based).
    pub attempt: u32,
    /// Brush colour at submission time.
    pub colour: Color,
}

/// Raw body of a scoring response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    /// Whether the guess matched the target.
    #[serde(default)]
    pub success: Option<bool>,
    /// The service's guess.
    #[serde(default)]
    pub guess: Option<String>,
    /// Category of the guess.
    #[serde(default)]
    pub category: Option<String>,
    /// Whether the category matched; defaults to `success`.
    #[serde(default)]
    pub category_match: Option<bool>,
    /// Whether the colour matched.
    #[serde(default)]
    pub color_match: Option<bool>,
    /// Whether the shape matched.
    #[serde(default)]
    pub shape_match: Option<bool>,
    /// Style bonus before capping. Numeric strings are accepted.
    #[serde(default, deserialize_with = "lenient_number")]
    pub style_score: Option<f64>,
    /// Server-computed score; overrides the local formula. Numeric strings
    /// are accepted.
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    /// Hint for the next attempt.
    #[serde(default)]
    pub hint: Option<String>,
    /// Where the target is likely found.
    #[serde(default)]
    pub hint_location: Option<String>,
}

/// A fully resolved submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Whether the round was won.
    pub success: bool,
    /// The service's guess, `"—"` when absent.
    pub guess: String,
    /// Category of the guess, `"—"` when absent.
    pub category: String,
    /// Category match flag.
    pub category_match: bool,
    /// Colour match flag.
    pub color_match: bool,
    /// Shape match flag.
    pub shape_match: bool,
    /// Uncapped style score.
    pub style_score: f64,
    /// Final score in `0..=100`.
    pub score: f64,
    /// Hint text (may be empty).
    pub hint: String,
    /// Location detail, only for failed submissions from attempt 3 on.
    pub hint_location: Option<String>,
    /// Attempt number the submission was made at.
    pub attempt: u32,
    /// Colour submitted with the drawing.
    pub colour: Color,
}

const PLACEHOLDER: &str = "—";

/// Read a number that may arrive as a JSON number or a numeric string.
/// Anything else reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl ScoreResponse {
    /// Resolve the response against the attempt it answers.
    #[must_use]
    pub fn resolve(self, attempt: u32, colour: Color) -> SubmissionResult {
        let success = self.success.unwrap_or(false);
        let color_match = self.color_match.unwrap_or(false);
        let shape_match = self.shape_match.unwrap_or(false);
        let style_score = self.style_score.filter(|s| s.is_finite()).unwrap_or(0.0);
        let score = self
            .score
            .filter(|s| s.is_finite())
            .unwrap_or_else(|| compute_score(color_match, shape_match, style_score, attempt));
        let hint_location = if !success && attempt >= LOCATION_HINT_FROM_ATTEMPT {
            non_empty(self.hint_location)
        } else {
            None
        };

        SubmissionResult {
            success,
            guess: non_empty(self.guess).unwrap_or_else(|| PLACEHOLDER.to_string()),
            category: non_empty(self.category).unwrap_or_else(|| PLACEHOLDER.to_string()),
            category_match: self.category_match.unwrap_or(success),
            color_match,
            shape_match,
            style_score,
            score,
            hint: self.hint.unwrap_or_default(),
            hint_location,
            attempt,
            colour,
        }
    }
}

impl SubmissionResult {
    /// Whether the guess is worth keeping in the history.
    #[must_use]
    pub fn has_guess(&self) -> bool {
        self.guess != PLACEHOLDER
    }

    /// Label of the submitted colour.
    #[must_use]
    pub fn colour_label(&self) -> String {
        colour_label(self.colour)
    }

    /// Hint text with its location detail, if any.
    #[must_use]
    pub fn hint_text(&self) -> Option<String> {
        if self.hint.trim().is_empty() {
            return None;
        }
        Some(match &self.hint_location {
            Some(location) => format!("{} - Likely found: {location}", self.hint),
            None => self.hint.clone(),
        })
    }
}

/// Local score when the service does not provide one.
///
/// `clamp(0, 100, 50 + 20*colour + 20*shape + min(style, 25) - 10*(attempt - 1))`
#[must_use]
pub fn compute_score(color_match: bool, shape_match: bool, style_score: f64, attempt: u32) -> f64 {
    let mut score = BASE_SCORE;
    if color_match {
        score += MATCH_BONUS;
    }
    if shape_match {
        score += MATCH_BONUS;
    }
    score += style_score.min(STYLE_BONUS_CAP);
    score -= ATTEMPT_PENALTY * f64::from(attempt.saturating_sub(1));
    score.clamp(0.0, 100.0)
}

/// Record returned by `GET /target`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// What the target is used for.
    #[serde(default)]
    pub use_for: Option<String>,
    /// Alternate spelling of the usage hint.
    #[serde(default)]
    pub use_hint: Option<String>,
    /// Alternate spelling of the usage hint.
    #[serde(default)]
    pub usage_hint: Option<String>,
    /// Alternate spelling of the usage hint.
    #[serde(default)]
    pub use_case: Option<String>,
    /// Alternate spelling of the usage hint.
    #[serde(default)]
    pub usecase: Option<String>,
    /// Public name of the target.
    #[serde(default)]
    pub public_name: Option<String>,
    /// Where the target is found.
    #[serde(default)]
    pub location: Option<String>,
}

impl TargetRecord {
    /// The first non-empty usage hint field, in priority order.
    #[must_use]
    pub fn usage_hint(&self) -> Option<String> {
        [
            &self.use_for,
            &self.use_hint,
            &self.usage_hint,
            &self.use_case,
            &self.usecase,
            &self.public_name,
            &self.location,
        ]
        .into_iter()
        .find_map(|field| non_empty(field.clone()))
    }
}

/// Body of `POST /leaderboard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player name.
    pub name: String,
    /// Final score, rounded to a whole number.
    pub score: u32,
    /// Attempt the round was won at.
    pub attempts: u32,
    /// Winning snapshot as a `data:` URI.
    pub image: String,
}

impl LeaderboardEntry {
    /// Build an entry, rounding `score` into `0..=100`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(name: impl Into<String>, score: f64, attempts: u32, image: impl Into<String>) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 100.0).round() as u32
        } else {
            0
        };
        Self {
            name: name.into(),
            score,
            attempts,
            image: image.into(),
        }
    }
}
