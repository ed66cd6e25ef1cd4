//! The undoable drawing document.

use serde::{Deserialize, Serialize};

use crate::{CoreResult, Stroke};

/// Ordered list of completed strokes.
///
/// The list is only ever mutated by [`append`](Self::append),
/// [`undo`](Self::undo) and [`clear`](Self::clear). There is no redo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
}

impl StrokeStore {
    /// Create an empty drawing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed stroke.
    pub fn append(&mut self, stroke: Stroke) {
        tracing::trace!(
            kind = ?stroke.kind(),
            points = stroke.points().len(),
            "stroke appended"
        );
        self.strokes.push(stroke);
    }

    /// Remove the most recent stroke, if any.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    /// Remove every stroke.
    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Strokes in insertion order.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Number of strokes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Whether the drawing has no strokes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Serialize the drawing to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a drawing from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a stroke is invalid.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<Stroke> for StrokeStore {
    fn from_iter<I: IntoIterator<Item = Stroke>>(iter: I) -> Self {
        Self {
            strokes: iter.into_iter().collect(),
        }
    }
}
