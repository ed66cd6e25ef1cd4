//! Error types for drawing and round operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in drawing and round operations.
///
/// Every variant carries a message fit to show the player; none of them
/// are retried automatically.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Submit was attempted with an empty drawing.
    #[error("Draw something first!")]
    EmptyDrawing,

    /// A hint was requested but no attempt is left to pay for it.
    #[error("No attempts left to spend on a hint")]
    NoAttemptsLeft,

    /// A hint was requested before any hint text exists.
    #[error("No hint available yet.")]
    HintUnavailable,

    /// A colour string could not be parsed.
    #[error("Invalid colour: {0}")]
    InvalidColor(String),

    /// A stroke violates its shape invariant.
    #[error("Invalid stroke: {0}")]
    InvalidStroke(String),

    /// Drawing serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the error is a local validation refusal (no state was touched).
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::EmptyDrawing | Self::NoAttemptsLeft | Self::HintUnavailable
        )
    }
}
