//! Export Options and Configuration
//!
//! Per-call options for a snapshot export, the image formats the encoder
//! understands, and the two policy enums that select how the pipeline lays
//! out and scales the capture.

use serde::{Deserialize, Serialize};

pub const MIN_QUALITY: f32 = 0.1;
pub const MAX_QUALITY: f32 = 1.0;
pub const MIN_SCALE: u32 = 1;
pub const MAX_SCALE: u32 = 4;

// ─────────────────────────────────────────────────────────────────────────────
// Image Format
// ─────────────────────────────────────────────────────────────────────────────

/// Output image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// Lossy JPEG honoring `quality`
    Jpg,
    /// SVG document wrapping a PNG raster (best effort)
    Svg,
}

impl ImageFormat {
    /// Get the display label for this format.
    pub fn label(&self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpg => "JPEG",
            ImageFormat::Svg => "SVG",
        }
    }

    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Parse a user-facing format name (`png`, `jpg`/`jpeg`, `svg`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpg),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    /// Get all available formats.
    pub fn all() -> &'static [ImageFormat] {
        &[ImageFormat::Png, ImageFormat::Jpg, ImageFormat::Svg]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline Policies
// ─────────────────────────────────────────────────────────────────────────────

/// Where output sharpness comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RasterMode {
    /// Ask the host to oversample while capturing
    #[default]
    Native,
    /// Capture at 1x and upscale in the compositor
    Composite,
}

impl RasterMode {
    /// Default output scale for this mode.
    pub fn default_scale(&self) -> u32 {
        match self {
            RasterMode::Native => 2,
            RasterMode::Composite => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RasterMode::Native => "Native oversampling",
            RasterMode::Composite => "Composited upscale",
        }
    }
}

/// How the clone's dimensions are settled before capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPolicy {
    /// Width and height follow the content at the viewport width
    Natural,
    /// Width forced to the canonical content width, height measured
    #[default]
    FixedWidth,
}

impl LayoutPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            LayoutPolicy::Natural => "Natural flow",
            LayoutPolicy::FixedWidth => "Fixed width",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options for one export call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Output format
    pub format: ImageFormat,

    /// JPEG quality in `0.1..=1.0`
    pub quality: f32,

    /// Output scale multiplier in `1..=4`
    pub scale: u32,

    /// Explicit capture width in CSS pixels
    pub width: Option<u32>,

    /// Explicit capture height in CSS pixels
    pub height: Option<u32>,

    /// Background override; `transparent` must be requested here explicitly
    pub background: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: MAX_QUALITY,
            scale: RasterMode::default().default_scale(),
            width: None,
            height: None,
            background: None,
        }
    }
}

impl ExportOptions {
    /// Copy of these options with `quality` and `scale` clamped into range.
    ///
    /// A non-finite quality is treated as the maximum.
    pub fn clamped(&self) -> Self {
        let quality = if self.quality.is_finite() {
            self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
        } else {
            MAX_QUALITY
        };
        Self {
            quality,
            scale: self.scale.clamp(MIN_SCALE, MAX_SCALE),
            width: self.width.filter(|w| *w > 0),
            height: self.height.filter(|h| *h > 0),
            ..self.clone()
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_background(mut self, background: &str) -> Self {
        self.background = Some(background.to_string());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_default() {
        assert_eq!(ImageFormat::default(), ImageFormat::Png);
    }

    #[test]
    fn test_image_format_metadata() {
        assert_eq!(ImageFormat::Jpg.label(), "JPEG");
        assert_eq!(ImageFormat::Jpg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.mime(), "image/png");
        assert_eq!(ImageFormat::Svg.mime(), "image/svg+xml");
        assert_eq!(ImageFormat::from_name("JPEG"), Some(ImageFormat::Jpg));
        assert_eq!(ImageFormat::from_name("gif"), None);
    }

    #[test]
    fn test_export_options_default() {
        let options = ExportOptions::default();
        assert_eq!(options.format, ImageFormat::Png);
        assert_eq!(options.quality, 1.0);
        assert_eq!(options.scale, 2);
        assert!(options.background.is_none());
    }

    #[test]
    fn test_clamping_out_of_range() {
        let options = ExportOptions::default().with_quality(5.0).with_scale(0).clamped();
        assert_eq!(options.quality, 1.0);
        assert_eq!(options.scale, 1);

        let options = ExportOptions::default().with_quality(0.0).with_scale(9).clamped();
        assert_eq!(options.quality, 0.1);
        assert_eq!(options.scale, 4);

        let options = ExportOptions::default().with_quality(f32::NAN).clamped();
        assert_eq!(options.quality, 1.0);
    }

    #[test]
    fn test_zero_dimensions_ignored() {
        let options = ExportOptions::default().with_size(Some(0), Some(300)).clamped();
        assert_eq!(options.width, None);
        assert_eq!(options.height, Some(300));
    }

    #[test]
    fn test_raster_mode_scales() {
        assert_eq!(RasterMode::Native.default_scale(), 2);
        assert_eq!(RasterMode::Composite.default_scale(), 3);
    }

    #[test]
    fn test_export_options_serialization() {
        let options = ExportOptions::default().with_format(ImageFormat::Jpg);
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"jpg\""));
        let deserialized: ExportOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(options, deserialized);
    }
}
