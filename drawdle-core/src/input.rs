//! Pointer input for the drawing surface.
//!
//! Raw pointer positions arrive in display coordinates (the size the surface
//! is shown at). They are mapped into canvas backing-pixel space before being
//! recorded, so a canvas displayed at half size still records full-size
//! coordinates.

use serde::{Deserialize, Serialize};

use crate::{Brush, Color, Point, Stroke};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed or finger down.
    Down,
    /// Pointer dragged.
    Move,
    /// Button released or finger lifted.
    Up,
    /// Pointer left the surface without a release.
    Leave,
    /// Gesture cancelled by the platform (e.g. palm rejection).
    Cancel,
}

/// Where the drawing surface is shown, in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Displayed width.
    pub width: f32,
    /// Displayed height.
    pub height: f32,
}

impl DisplayRect {
    /// Rectangle at the origin with the given size.
    #[must_use]
    pub const fn sized(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
struct Gesture {
    points: Vec<Point>,
    moved: bool,
    color: Color,
    width: f32,
}

/// Turns raw pointer events into strokes.
///
/// At most one gesture is active at a time. Points are scaled linearly and
/// never clamped, so a drag that leaves the surface keeps its true position.
#[derive(Debug, Clone)]
pub struct PointerInputTracker {
    backing_width: f32,
    backing_height: f32,
    display: DisplayRect,
    gesture: Option<Gesture>,
}

impl PointerInputTracker {
    /// Create a tracker for a canvas with the given backing size, displayed 1:1.
    #[must_use]
    pub fn new(backing_width: f32, backing_height: f32) -> Self {
        Self {
            backing_width,
            backing_height,
            display: DisplayRect::sized(backing_width, backing_height),
            gesture: None,
        }
    }

    /// Update where the surface is displayed.
    pub fn set_display_rect(&mut self, display: DisplayRect) {
        self.display = display;
    }

    /// Map a display-space position into canvas space.
    #[must_use]
    pub fn to_canvas(&self, raw: Point) -> Point {
        let scale = |offset: f32, displayed: f32, backing: f32| {
            if displayed > 0.0 {
                offset / displayed * backing
            } else {
                offset
            }
        };
        Point::new(
            scale(raw.x - self.display.left, self.display.width, self.backing_width),
            scale(raw.y - self.display.top, self.display.height, self.backing_height),
        )
    }

    /// Begin a gesture with the brush as it is now.
    ///
    /// A gesture already in progress is discarded.
    pub fn start(&mut self, raw: Point, brush: &Brush) {
        if self.gesture.is_some() {
            tracing::debug!("pointer down during an active gesture; restarting");
        }
        self.gesture = Some(Gesture {
            points: vec![self.to_canvas(raw)],
            moved: false,
            color: brush.paint_color(),
            width: brush.width(),
        });
    }

    /// Extend the active gesture. Ignored when no gesture is active.
    pub fn move_to(&mut self, raw: Point) {
        let point = self.to_canvas(raw);
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.points.push(point);
            gesture.moved = true;
        }
    }

    /// Finish the active gesture.
    ///
    /// Returns `None` when no gesture is active. A gesture that never moved,
    /// or recorded a single point, becomes a dot at its first point.
    pub fn end(&mut self) -> Option<Stroke> {
        let gesture = self.gesture.take()?;
        let first = *gesture.points.first()?;
        if !gesture.moved || gesture.points.len() == 1 {
            return Some(Stroke::dot(first, gesture.color, gesture.width));
        }
        Stroke::path(gesture.points, gesture.color, gesture.width).ok()
    }

    /// Discard the active gesture without producing a stroke.
    pub fn cancel(&mut self) {
        self.gesture = None;
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Canvas-space points of the gesture in progress.
    #[must_use]
    pub fn current_points(&self) -> &[Point] {
        self.gesture.as_ref().map_or(&[], |g| g.points.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrokeKind;

    fn brush() -> Brush {
        Brush::new(Color::rgb(0xe6, 0x39, 0x46), 10.0)
    }

    #[test]
    fn test_tap_yields_dot() {
        let mut tracker = PointerInputTracker::new(100.0, 100.0);
        tracker.start(Point::new(10.0, 20.0), &brush());
        let stroke = tracker.end().expect("stroke");
        assert_eq!(stroke.kind(), StrokeKind::Dot);
        assert_eq!(stroke.points(), &[Point::new(10.0, 20.0)]);
        assert_eq!(stroke.color, Color::rgb(0xe6, 0x39, 0x46));
    }

    #[test]
    fn test_drag_yields_path() {
        let mut tracker = PointerInputTracker::new(100.0, 100.0);
        tracker.start(Point::new(0.0, 0.0), &brush());
        tracker.move_to(Point::new(5.0, 5.0));
        tracker.move_to(Point::new(10.0, 0.0));
        let stroke = tracker.end().expect("stroke");
        assert_eq!(stroke.kind(), StrokeKind::Path);
        assert_eq!(stroke.points().len(), 3);
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_scaling_from_display_space() {
        let mut tracker = PointerInputTracker::new(1000.0, 800.0);
        tracker.set_display_rect(DisplayRect {
            left: 50.0,
            top: 20.0,
            width: 500.0,
            height: 400.0,
        });
        let p = tracker.to_canvas(Point::new(300.0, 220.0));
        assert_eq!(p, Point::new(500.0, 400.0));

        // Outside the surface: scaled, not clamped.
        let outside = tracker.to_canvas(Point::new(0.0, 0.0));
        assert!((outside.x + 100.0).abs() < 1e-3);
        assert!((outside.y + 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_move_and_end_without_gesture() {
        let mut tracker = PointerInputTracker::new(100.0, 100.0);
        tracker.move_to(Point::new(1.0, 1.0));
        assert!(tracker.current_points().is_empty());
        assert!(tracker.end().is_none());
    }

    #[test]
    fn test_cancel_discards_gesture() {
        let mut tracker = PointerInputTracker::new(100.0, 100.0);
        tracker.start(Point::new(1.0, 1.0), &brush());
        tracker.move_to(Point::new(2.0, 2.0));
        tracker.cancel();
        assert!(tracker.end().is_none());
    }

    #[test]
    fn test_brush_captured_at_start() {
        let mut tracker = PointerInputTracker::new(100.0, 100.0);
        let mut b = brush();
        tracker.start(Point::new(1.0, 1.0), &b);
        b.eraser = true;
        tracker.move_to(Point::new(3.0, 3.0));
        let stroke = tracker.end().expect("stroke");
        assert_eq!(stroke.color, Color::rgb(0xe6, 0x39, 0x46));
    }
}
