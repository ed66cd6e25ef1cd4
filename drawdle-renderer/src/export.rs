//! Snapshot export.
//!
//! Encodes a rendered [`Surface`] into the payload that crosses the network
//! boundary: PNG by default, JPEG when a smaller upload matters, or the raw
//! SVG text for debugging.

use std::sync::Arc;

use base64::Engine as _;
use drawdle_core::Stroke;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::render::{Renderer, Surface};

/// Snapshot output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG document (UTF-8 text).
    Svg,
}

impl ExportFormat {
    /// MIME type of the encoded payload.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }
}

/// Configuration for snapshot export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format.
    pub format: ExportFormat,
    /// JPEG quality 1-100 (default: 85).
    pub jpeg_quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            jpeg_quality: 85,
        }
    }
}

/// An encoded image of the whole surface.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    format: ExportFormat,
    bytes: Arc<[u8]>,
}

impl Snapshot {
    /// Wrap already-encoded bytes.
    #[must_use]
    pub fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }

    /// Encoding of the payload.
    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `data:<mime>;base64,<payload>` URI.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Encodes rendered surfaces.
#[derive(Debug, Clone, Default)]
pub struct RasterExporter {
    config: ExportConfig,
}

impl RasterExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Render `strokes` and encode the result in the configured format.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export(&self, renderer: &Renderer, strokes: &[Stroke]) -> RenderResult<Snapshot> {
        let bytes = match self.config.format {
            ExportFormat::Svg => renderer.to_svg(strokes).into_bytes(),
            ExportFormat::Png => Self::encode_png(&renderer.render(strokes)?)?,
            ExportFormat::Jpeg => self.encode_jpeg(&renderer.render(strokes)?)?,
        };
        tracing::trace!(
            format = ?self.config.format,
            bytes = bytes.len(),
            "snapshot exported"
        );
        Ok(Snapshot::new(self.config.format, bytes))
    }

    /// Encode a surface as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_png(surface: &Surface) -> RenderResult<Vec<u8>> {
        surface
            .pixmap()
            .encode_png()
            .map_err(|e| RenderError::Encode {
                format: "PNG",
                message: e.to_string(),
            })
    }

    /// Encode a surface as JPEG at the configured quality.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails, or [`RenderError::Unsupported`]
    /// when built without the `jpeg` feature.
    #[cfg(feature = "jpeg")]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn encode_jpeg(&self, surface: &Surface) -> RenderResult<Vec<u8>> {
        use image::ImageEncoder;

        let (width, height) = (surface.width(), surface.height());
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        // Premultiplied RGBA composited over white.
        for pixel in surface.rgba().chunks_exact(4) {
            let inv = 255.0 - f32::from(pixel[3]);
            for &channel in &pixel[..3] {
                rgb_data.push((f32::from(channel) + inv).min(255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
            .map_err(|e| RenderError::Encode {
                format: "JPEG",
                message: e.to_string(),
            })?;

        Ok(buf.into_inner())
    }

    /// Encode a surface as JPEG at the configured quality.
    ///
    /// # Errors
    ///
    /// Always returns [`RenderError::Unsupported`] in this build.
    #[cfg(not(feature = "jpeg"))]
    pub fn encode_jpeg(&self, _surface: &Surface) -> RenderResult<Vec<u8>> {
        Err(RenderError::Unsupported("jpeg"))
    }
}
