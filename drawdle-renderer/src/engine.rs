//! Canvas engine: pointer input, stroke history, rendering and export behind
//! one facade.
//!
//! Every mutation of the stroke list (commit, undo, clear) re-renders the
//! whole list and replaces the current snapshot before returning, so
//! [`CanvasEngine::snapshot`] always matches [`CanvasEngine::strokes`].

use drawdle_core::{
    Brush, Color, DisplayRect, Point, PointerInputTracker, PointerPhase, Stroke, StrokeStore,
};
use serde::{Deserialize, Serialize};

use crate::error::RenderResult;
use crate::export::{ExportConfig, RasterExporter, Snapshot};
use crate::render::{Renderer, Surface};

/// Default canvas backing width.
pub const DEFAULT_CANVAS_WIDTH: u32 = 1000;

/// Default canvas backing height.
pub const DEFAULT_CANVAS_HEIGHT: u32 = 800;

/// Canvas size and export settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Backing width in pixels.
    pub width: u32,
    /// Backing height in pixels.
    pub height: u32,
    /// Snapshot encoding.
    pub export: ExportConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            export: ExportConfig::default(),
        }
    }
}

/// The drawing surface a round is played on.
#[derive(Debug)]
pub struct CanvasEngine {
    tracker: PointerInputTracker,
    store: StrokeStore,
    brush: Brush,
    renderer: Renderer,
    exporter: RasterExporter,
    snapshot: Snapshot,
    revision: u64,
}

impl CanvasEngine {
    /// Create an empty canvas and its initial (blank) snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the blank surface cannot be rendered.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(config: CanvasConfig) -> RenderResult<Self> {
        let renderer = Renderer::new(config.width, config.height);
        let exporter = RasterExporter::new(config.export);
        let snapshot = exporter.export(&renderer, &[])?;
        Ok(Self {
            tracker: PointerInputTracker::new(config.width as f32, config.height as f32),
            store: StrokeStore::new(),
            brush: Brush::default(),
            renderer,
            exporter,
            snapshot,
            revision: 0,
        })
    }

    /// Current snapshot of the whole surface.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Whether at least one stroke has been committed.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.store.is_empty()
    }

    /// Committed strokes in drawing order.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        self.store.strokes()
    }

    /// Number of mutations so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current brush.
    #[must_use]
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Select a brush colour. Leaves eraser mode.
    pub fn set_color(&mut self, color: Color) {
        self.brush.color = color;
        self.brush.eraser = false;
    }

    /// Set the brush width (clamped).
    pub fn set_width(&mut self, width: f32) {
        self.brush.set_width(width);
    }

    /// Turn eraser mode on or off.
    pub fn set_eraser(&mut self, eraser: bool) {
        self.brush.eraser = eraser;
    }

    /// Update where the canvas is displayed, for pointer scaling.
    pub fn set_display_rect(&mut self, display: DisplayRect) {
        self.tracker.set_display_rect(display);
    }

    /// Pointer pressed at a display-space position.
    pub fn pointer_down(&mut self, raw: Point) {
        self.tracker.start(raw, &self.brush);
    }

    /// Pointer moved to a display-space position.
    pub fn pointer_move(&mut self, raw: Point) {
        self.tracker.move_to(raw);
    }

    /// Pointer released (or left the canvas). Commits the gesture.
    ///
    /// Returns whether a stroke was committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be re-rendered.
    pub fn pointer_up(&mut self) -> RenderResult<bool> {
        match self.tracker.end() {
            Some(stroke) => {
                self.append(stroke)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Gesture cancelled by the platform; nothing is committed.
    pub fn pointer_cancel(&mut self) {
        self.tracker.cancel();
    }

    /// Dispatch a pointer event by phase. `position` is ignored for phases
    /// that carry none.
    ///
    /// # Errors
    ///
    /// Returns an error if a commit cannot be re-rendered.
    pub fn handle_pointer(&mut self, phase: PointerPhase, position: Point) -> RenderResult<bool> {
        match phase {
            PointerPhase::Down => {
                self.pointer_down(position);
                Ok(false)
            }
            PointerPhase::Move => {
                self.pointer_move(position);
                Ok(false)
            }
            PointerPhase::Up | PointerPhase::Leave => self.pointer_up(),
            PointerPhase::Cancel => {
                self.pointer_cancel();
                Ok(false)
            }
        }
    }

    /// Append a finished stroke and refresh the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be re-rendered; the stroke is
    /// not kept.
    pub fn append(&mut self, stroke: Stroke) -> RenderResult<()> {
        tracing::debug!(
            kind = ?stroke.kind(),
            points = stroke.points().len(),
            color = %stroke.color,
            "stroke committed"
        );
        self.store.append(stroke);
        if let Err(e) = self.refresh() {
            self.store.undo();
            return Err(e);
        }
        Ok(())
    }

    /// Remove the last stroke. No-op on an empty canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be re-rendered; the stroke is
    /// put back.
    pub fn undo(&mut self) -> RenderResult<Option<Stroke>> {
        let Some(removed) = self.store.undo() else {
            return Ok(None);
        };
        if let Err(e) = self.refresh() {
            self.store.append(removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Remove every stroke.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be re-rendered; the strokes
    /// are kept.
    pub fn clear(&mut self) -> RenderResult<()> {
        self.tracker.cancel();
        let previous = std::mem::take(&mut self.store);
        if let Err(e) = self.refresh() {
            self.store = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Render the current strokes to a surface, for inspection.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_surface(&self) -> RenderResult<Surface> {
        self.renderer.render(self.store.strokes())
    }

    /// Replace the snapshot from the current strokes. Leaves the previous
    /// snapshot and revision untouched on failure.
    fn refresh(&mut self) -> RenderResult<()> {
        self.snapshot = self.exporter.export(&self.renderer, self.store.strokes())?;
        self.revision += 1;
        Ok(())
    }
}
