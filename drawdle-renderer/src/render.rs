//! Full-redraw stroke renderer.
//!
//! Strokes are turned into an SVG document and rasterized with resvg onto a
//! tiny-skia pixmap. The output depends only on the stroke list and the
//! surface size, so replaying the same list always gives the same pixels.

use std::fmt::Write;

use drawdle_core::{Color, Point, Stroke, StrokeKind};

use crate::error::{RenderError, RenderResult};

/// Draws a stroke list onto a fresh surface.
#[derive(Debug, Clone)]
pub struct Renderer {
    width: u32,
    height: u32,
    background: Color,
}

impl Renderer {
    /// Create a renderer for a surface of the given backing size, cleared to white.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: Color::WHITE,
        }
    }

    /// Use a different background colour.
    #[must_use]
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Surface width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Background colour.
    #[must_use]
    pub fn background(&self) -> Color {
        self.background
    }

    /// Build the SVG document for `strokes`, in insertion order.
    #[must_use]
    pub fn to_svg(&self, strokes: &[Stroke]) -> String {
        let (w, h) = (self.width, self.height);
        let mut svg = String::with_capacity(256 + strokes.len() * 128);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        );
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            self.background
        );
        for stroke in strokes {
            if !stroke.points().iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
                tracing::warn!("skipping stroke with non-finite coordinates");
                continue;
            }
            render_stroke_svg(&mut svg, stroke);
        }
        svg.push_str("</svg>");
        svg
    }

    /// Rasterize `strokes` onto a new surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface size is invalid or the intermediate
    /// SVG cannot be parsed.
    pub fn render(&self, strokes: &[Stroke]) -> RenderResult<Surface> {
        let mut pixmap =
            tiny_skia::Pixmap::new(self.width, self.height).ok_or(RenderError::SurfaceSize {
                width: self.width,
                height: self.height,
            })?;

        let svg = self.to_svg(strokes);
        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default())
            .map_err(|e| RenderError::Svg(e.to_string()))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        tracing::trace!(strokes = strokes.len(), "surface rendered");
        Ok(Surface { pixmap })
    }
}

/// Write one stroke.
///
/// A dot is a filled circle of radius `width / 2`. A path starts at its first
/// point, runs a quadratic segment through each interior point (the point is
/// the control, the midpoint to the next point the end), then a straight
/// segment to the last point.
fn render_stroke_svg(svg: &mut String, stroke: &Stroke) {
    let color = stroke.color;
    let width = stroke.width;
    match stroke.kind() {
        StrokeKind::Dot => {
            let p = stroke.points()[0];
            let r = width / 2.0;
            let _ = write!(
                svg,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{r}\" fill=\"{color}\"/>",
                p.x, p.y,
            );
        }
        StrokeKind::Path => {
            let _ = write!(
                svg,
                "<path d=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{width}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                smoothed_path_data(stroke.points()),
            );
        }
    }
}

/// SVG path data for the smoothed curve through `points`.
#[must_use]
pub fn smoothed_path_data(points: &[Point]) -> String {
    let mut d = String::with_capacity(points.len() * 24);
    let Some((first, rest)) = points.split_first() else {
        return d;
    };
    let _ = write!(d, "M{} {}", first.x, first.y);
    if let Some((last, interior)) = rest.split_last() {
        for (i, control) in interior.iter().enumerate() {
            let next = rest[i + 1];
            let end = control.midpoint(next);
            let _ = write!(d, " Q{} {} {} {}", control.x, control.y, end.x, end.y);
        }
        let _ = write!(d, " L{} {}", last.x, last.y);
    }
    d
}

/// A rendered RGBA surface.
#[derive(Clone)]
pub struct Surface {
    pixmap: tiny_skia::Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.pixmap.data() == other.pixmap.data()
    }
}

impl Surface {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// RGBA bytes, row-major. The background is opaque, so these are not
    /// affected by premultiplication.
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// RGBA value of one pixel, `None` outside the surface.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?.demultiply();
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    pub(crate) fn pixmap(&self) -> &tiny_skia::Pixmap {
        &self.pixmap
    }
}
