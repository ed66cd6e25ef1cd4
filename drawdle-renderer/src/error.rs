//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The canvas size is zero or too large for a pixmap.
    #[error("Invalid surface size: {width}x{height}")]
    SurfaceSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The intermediate SVG could not be parsed.
    #[error("SVG parsing failed: {0}")]
    Svg(String),

    /// Encoding to the output format failed.
    #[error("{format} encoding failed: {message}")]
    Encode {
        /// Output format name.
        format: &'static str,
        /// Encoder message.
        message: String,
    },

    /// The format was compiled out.
    #[error("Export format not available in this build: {0}")]
    Unsupported(&'static str),
}
