//! Strokes - the building blocks of a drawing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Smallest brush width the toolbar allows.
pub const MIN_BRUSH_WIDTH: f32 = 4.0;

/// Largest brush width the toolbar allows.
pub const MAX_BRUSH_WIDTH: f32 = 28.0;

/// Brush width a new round starts with.
pub const DEFAULT_BRUSH_WIDTH: f32 = 12.0;

/// Palette offered to the player, with display labels.
pub const PALETTE: [(Color, &str); 6] = [
    (Color::rgb(0x00, 0x00, 0x00), "Black"),
    (Color::rgb(0xe6, 0x39, 0x46), "Red"),
    (Color::rgb(0x45, 0x7b, 0x9d), "Blue"),
    (Color::rgb(0x2a, 0x9d, 0x8f), "Green"),
    (Color::rgb(0xf4, 0xa2, 0x61), "Orange"),
    (Color::rgb(0xf9, 0xc7, 0x4f), "Yellow"),
];

/// A point in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Midpoint between this point and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// An opaque RGB colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Black, the default brush colour.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// White, the canvas background and the eraser colour.
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);

    /// Create a colour from channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` form.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..=i].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Human label for a colour: the palette name, or the upper-cased hex code.
#[must_use]
pub fn colour_label(color: Color) -> String {
    PALETTE
        .iter()
        .find(|(c, _)| *c == color)
        .map_or_else(|| color.to_hex().to_uppercase(), |(_, label)| (*label).to_string())
}

/// How a stroke is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    /// A tap: one point, drawn as a filled circle.
    Dot,
    /// A drag: two or more points, drawn as a smoothed curve.
    Path,
}

/// One continuous drawing gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStroke")]
pub struct Stroke {
    points: Vec<Point>,
    /// Paint colour.
    pub color: Color,
    /// Brush width in pixels.
    pub width: f32,
    kind: StrokeKind,
}

impl Stroke {
    /// Create a dot stroke at a single point.
    #[must_use]
    pub fn dot(point: Point, color: Color, width: f32) -> Self {
        Self {
            points: vec![point],
            color,
            width,
            kind: StrokeKind::Dot,
        }
    }

    /// Create a path stroke.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidStroke`] if fewer than two points are given.
    pub fn path(points: Vec<Point>, color: Color, width: f32) -> CoreResult<Self> {
        if points.len() < 2 {
            return Err(CoreError::InvalidStroke(format!(
                "a path needs at least 2 points, got {}",
                points.len()
            )));
        }
        Ok(Self {
            points,
            color,
            width,
            kind: StrokeKind::Path,
        })
    }

    /// The recorded points, in input order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether this stroke is a dot or a path.
    #[must_use]
    pub fn kind(&self) -> StrokeKind {
        self.kind
    }

    /// Whether this stroke renders as a filled circle.
    #[must_use]
    pub fn is_dot(&self) -> bool {
        self.kind == StrokeKind::Dot
    }
}

#[derive(Deserialize)]
struct RawStroke {
    points: Vec<Point>,
    color: Color,
    width: f32,
    kind: StrokeKind,
}

impl TryFrom<RawStroke> for Stroke {
    type Error = CoreError;

    fn try_from(raw: RawStroke) -> CoreResult<Self> {
        match raw.kind {
            StrokeKind::Dot => match raw.points.as_slice() {
                [point] => Ok(Self::dot(*point, raw.color, raw.width)),
                other => Err(CoreError::InvalidStroke(format!(
                    "a dot needs exactly 1 point, got {}",
                    other.len()
                ))),
            },
            StrokeKind::Path => Self::path(raw.points, raw.color, raw.width),
        }
    }
}

/// The player's current drawing tool settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    /// Selected colour.
    pub color: Color,
    width: f32,
    /// Eraser mode paints in the background colour.
    pub eraser: bool,
}

impl Brush {
    /// Create a brush; the width is clamped to the allowed range.
    #[must_use]
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width: width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH),
            eraser: false,
        }
    }

    /// Brush width in pixels.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Change the width, clamped to the allowed range.
    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH);
    }

    /// Colour a stroke drawn now would be painted with.
    #[must_use]
    pub fn paint_color(&self) -> Color {
        if self.eraser {
            Color::WHITE
        } else {
            self.color
        }
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self::new(Color::BLACK, DEFAULT_BRUSH_WIDTH)
    }
}
