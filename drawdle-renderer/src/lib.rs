//! # Drawdle Renderer
//!
//! Turns a stroke list into pixels and pixels into an uploadable snapshot.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Pointer      │──►│ StrokeStore  │──►│ Renderer     │──►│ Exporter     │
//! │ tracker      │   │ append/undo  │   │ SVG → resvg  │   │ PNG/JPEG/SVG │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!          └───────────────── CanvasEngine ─────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod export;
pub mod render;

pub use engine::{CanvasConfig, CanvasEngine, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
pub use error::{RenderError, RenderResult};
pub use export::{ExportConfig, ExportFormat, RasterExporter, Snapshot};
pub use render::{smoothed_path_data, Renderer, Surface};
