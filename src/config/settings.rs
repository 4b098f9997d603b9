//! Settings data structures for Markshot
//!
//! This module defines the persisted user preferences: the default theme,
//! export defaults, and the status indicator timing. Everything is
//! serde-friendly and every field has a default, so partial or older
//! config files still load.

use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::export::controller::DeliveryConfig;
use crate::export::layout::{LayoutConfig, DEFAULT_CANONICAL_WIDTH, DEFAULT_VIEWPORT_WIDTH};
use crate::export::options::{
    ExportOptions, ImageFormat, LayoutPolicy, RasterMode, MAX_QUALITY, MAX_SCALE, MIN_QUALITY,
    MIN_SCALE,
};
use crate::export::pipeline::PipelineConfig;
use crate::theme::presets;

// ─────────────────────────────────────────────────────────────────────────────
// Export Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted export defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Output image format
    pub format: ImageFormat,

    /// JPEG quality (0.1 - 1.0)
    pub quality: f32,

    /// Output scale multiplier (1 - 4)
    pub scale: u32,

    /// Whether the host oversamples or the compositor upscales
    pub raster_mode: RasterMode,

    /// How the capture dimensions are settled
    pub layout_policy: LayoutPolicy,

    /// Width forced by the fixed-width policy, in CSS pixels
    pub canonical_width: u32,

    /// Width available to the natural-flow policy, in CSS pixels
    pub viewport_width: u32,

    /// Upper bound on waiting for web fonts, in milliseconds
    pub font_timeout_ms: u64,

    /// Vertical text shift applied before capture, in CSS pixels
    pub baseline_offset_px: f32,

    /// Copy the image to the clipboard after saving
    pub copy_to_clipboard: bool,

    /// Where images are saved (None = downloads directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_directory: Option<PathBuf>,

    /// Open the saved image with the system viewer
    pub open_after_save: bool,

    /// Request cross-origin images with CORS
    pub use_cors: bool,

    /// Capture tainted images instead of failing
    pub allow_taint: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            format: ImageFormat::Png,
            quality: MAX_QUALITY,
            scale: RasterMode::default().default_scale(),
            raster_mode: RasterMode::default(),
            layout_policy: LayoutPolicy::default(),
            canonical_width: DEFAULT_CANONICAL_WIDTH,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            font_timeout_ms: pipeline.font_timeout.as_millis() as u64,
            baseline_offset_px: pipeline.baseline_offset_px,
            copy_to_clipboard: true,
            save_directory: None,
            open_after_save: false,
            use_cors: pipeline.use_cors,
            allow_taint: pipeline.allow_taint,
        }
    }
}

impl ExportSettings {
    pub const MIN_WIDTH: u32 = 200;
    pub const MAX_WIDTH: u32 = 4000;
    pub const MIN_VIEWPORT_WIDTH: u32 = 200;
    pub const MAX_VIEWPORT_WIDTH: u32 = 8000;
    pub const MIN_FONT_TIMEOUT_MS: u64 = 100;
    pub const MAX_FONT_TIMEOUT_MS: u64 = 30_000;
    pub const MAX_BASELINE_OFFSET: f32 = 8.0;

    /// Clamp every numeric field into its valid range.
    pub fn sanitize(&mut self) {
        self.quality = if self.quality.is_finite() {
            self.quality.clamp(MIN_QUALITY, MAX_QUALITY)
        } else {
            MAX_QUALITY
        };
        self.scale = self.scale.clamp(MIN_SCALE, MAX_SCALE);
        self.canonical_width = self.canonical_width.clamp(Self::MIN_WIDTH, Self::MAX_WIDTH);
        self.viewport_width = self
            .viewport_width
            .clamp(Self::MIN_VIEWPORT_WIDTH, Self::MAX_VIEWPORT_WIDTH);
        self.font_timeout_ms = self
            .font_timeout_ms
            .clamp(Self::MIN_FONT_TIMEOUT_MS, Self::MAX_FONT_TIMEOUT_MS);
        self.baseline_offset_px = if self.baseline_offset_px.is_finite() {
            self.baseline_offset_px
                .clamp(-Self::MAX_BASELINE_OFFSET, Self::MAX_BASELINE_OFFSET)
        } else {
            0.0
        };
    }

    /// Per-call options derived from these defaults.
    pub fn to_options(&self) -> ExportOptions {
        ExportOptions::default()
            .with_format(self.format)
            .with_quality(self.quality)
            .with_scale(self.scale)
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            layout: LayoutConfig {
                policy: self.layout_policy,
                canonical_width: self.canonical_width,
                viewport_width: self.viewport_width,
            },
            raster_mode: self.raster_mode,
            font_timeout: Duration::from_millis(self.font_timeout_ms),
            baseline_offset_px: self.baseline_offset_px,
            use_cors: self.use_cors,
            allow_taint: self.allow_taint,
        }
    }

    /// Save directory: configured, else the downloads directory, else the
    /// current directory.
    pub fn resolve_save_dir(&self) -> PathBuf {
        self.save_directory
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn to_delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            save_dir: Some(self.resolve_save_dir()),
            copy_to_clipboard: self.copy_to_clipboard,
            open_after_save: self.open_after_save,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Application settings that persist between sessions.
///
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Theme id used when none is given
    pub default_theme: String,

    /// Export defaults
    pub export: ExportSettings,

    /// Seconds before a success/error status returns to idle
    pub status_reset_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_theme: "light".to_string(),
            export: ExportSettings::default(),
            status_reset_secs: 3,
        }
    }
}

impl Settings {
    pub const MIN_STATUS_RESET_SECS: u64 = 1;
    pub const MAX_STATUS_RESET_SECS: u64 = 60;

    /// Validate and fix any out-of-range values.
    pub fn sanitize(&mut self) {
        if presets::find(&self.default_theme).is_none() {
            warn!(
                "Unknown default theme '{}', falling back to 'light'",
                self.default_theme
            );
            self.default_theme = "light".to_string();
        }
        self.export.sanitize();
        self.status_reset_secs = self
            .status_reset_secs
            .clamp(Self::MIN_STATUS_RESET_SECS, Self::MAX_STATUS_RESET_SECS);
    }

    /// Load settings and sanitize them to ensure validity.
    ///
    /// This is a convenience method that deserializes and then sanitizes.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn status_reset(&self) -> Duration {
        Duration::from_secs(self.status_reset_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_theme, "light");
        assert_eq!(settings.status_reset_secs, 3);
        assert_eq!(settings.export.format, ImageFormat::Png);
        assert_eq!(settings.export.scale, 2);
        assert_eq!(settings.export.canonical_width, 800);
        assert!(settings.export.copy_to_clipboard);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            Settings::from_json_sanitized(r#"{"default_theme": "dark", "export": {"format": "jpg"}}"#)
                .unwrap();
        assert_eq!(settings.default_theme, "dark");
        assert_eq!(settings.export.format, ImageFormat::Jpg);
        assert_eq!(settings.export.quality, 1.0);
        assert_eq!(settings.export.layout_policy, LayoutPolicy::FixedWidth);
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut settings = Settings {
            default_theme: "nope".to_string(),
            status_reset_secs: 0,
            ..Settings::default()
        };
        settings.export.quality = 5.0;
        settings.export.scale = 0;
        settings.export.canonical_width = 10;
        settings.export.font_timeout_ms = u64::MAX;
        settings.export.baseline_offset_px = f32::NAN;
        settings.sanitize();

        assert_eq!(settings.default_theme, "light");
        assert_eq!(settings.status_reset_secs, Settings::MIN_STATUS_RESET_SECS);
        assert_eq!(settings.export.quality, 1.0);
        assert_eq!(settings.export.scale, 1);
        assert_eq!(settings.export.canonical_width, ExportSettings::MIN_WIDTH);
        assert_eq!(settings.export.font_timeout_ms, ExportSettings::MAX_FONT_TIMEOUT_MS);
        assert_eq!(settings.export.baseline_offset_px, 0.0);
    }

    #[test]
    fn test_bridges() {
        let mut export = ExportSettings {
            format: ImageFormat::Jpg,
            quality: 0.8,
            scale: 3,
            raster_mode: RasterMode::Composite,
            layout_policy: LayoutPolicy::Natural,
            viewport_width: 1280,
            font_timeout_ms: 500,
            baseline_offset_px: -1.0,
            save_directory: Some(PathBuf::from("/tmp/shots")),
            ..ExportSettings::default()
        };
        export.sanitize();

        let options = export.to_options();
        assert_eq!(options.format, ImageFormat::Jpg);
        assert_eq!(options.quality, 0.8);
        assert_eq!(options.scale, 3);

        let config = export.to_pipeline_config();
        assert_eq!(config.layout.policy, LayoutPolicy::Natural);
        assert_eq!(config.layout.viewport_width, 1280);
        assert_eq!(config.raster_mode, RasterMode::Composite);
        assert_eq!(config.font_timeout, Duration::from_millis(500));
        assert_eq!(config.baseline_offset_px, -1.0);

        let delivery = export.to_delivery_config();
        assert_eq!(delivery.save_dir, Some(PathBuf::from("/tmp/shots")));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut settings = Settings::default();
        settings.default_theme = "ocean".to_string();
        settings.export.open_after_save = true;
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert!(!json.contains("save_directory"));
        let loaded = Settings::from_json_sanitized(&json).unwrap();
        assert_eq!(settings, loaded);
    }
}
