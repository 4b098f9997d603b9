//! Export pipeline
//!
//! One export call runs the stages strictly in order: clone the live target,
//! stabilize layout, wait for fonts, rasterize through the host, composite,
//! encode. The live document is only borrowed immutably, so nothing the
//! pipeline prepares can leak back into the preview the user is looking at.

use std::time::Duration;

use chrono::Utc;
use image::RgbaImage;
use log::{info, warn};

use super::clone::{clone_target, CaptureTarget};
use super::compositor::composite;
use super::encoder::{encode, export_file_name, EncodedImage};
use super::fonts::{wait_for_fonts, FontReport};
use super::host::{CaptureConfig, RenderHost};
use super::layout::{stabilize, LayoutConfig};
use super::options::{ExportOptions, RasterMode};
use super::raster::{rasterize, resolve_background, BaselineHook, StyleAdjustment};
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::theme::Theme;

pub const DEFAULT_FONT_TIMEOUT: Duration = Duration::from_millis(3000);

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Exporter settings that hold across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub layout: LayoutConfig,
    pub raster_mode: RasterMode,
    /// Upper bound on the font-readiness barrier
    pub font_timeout: Duration,
    /// Vertical text calibration handed to the default hook
    pub baseline_offset_px: f32,
    pub use_cors: bool,
    pub allow_taint: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            raster_mode: RasterMode::default(),
            font_timeout: DEFAULT_FONT_TIMEOUT,
            baseline_offset_px: 0.0,
            use_cors: true,
            allow_taint: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Result
// ─────────────────────────────────────────────────────────────────────────────

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportSuccess {
    pub encoded: EncodedImage,
    /// Final composited pixels
    pub image: RgbaImage,
    pub file_name: String,
    pub fonts: FontReport,
}

impl ExportSuccess {
    pub fn data_url(&self) -> &str {
        &self.encoded.data_url
    }

    pub fn mime(&self) -> &'static str {
        self.encoded.mime
    }
}

#[derive(Debug)]
pub enum ExportResult {
    Success(Box<ExportSuccess>),
    Failure(Error),
}

impl ExportResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportResult::Success(_))
    }

    pub fn success(&self) -> Option<&ExportSuccess> {
        match self {
            ExportResult::Success(success) => Some(success),
            ExportResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            ExportResult::Success(_) => None,
            ExportResult::Failure(err) => Some(err),
        }
    }
}

impl From<Result<ExportSuccess>> for ExportResult {
    fn from(result: Result<ExportSuccess>) -> Self {
        match result {
            Ok(success) => ExportResult::Success(Box::new(success)),
            Err(err) => ExportResult::Failure(err),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Exporter
// ─────────────────────────────────────────────────────────────────────────────

/// Drives the pipeline against a render host.
pub struct Exporter<H: RenderHost> {
    host: H,
    config: PipelineConfig,
    hook: Box<dyn StyleAdjustment>,
}

impl<H: RenderHost> Exporter<H> {
    pub fn new(host: H, config: PipelineConfig) -> Self {
        let hook = Box::new(BaselineHook::new(config.baseline_offset_px));
        Self { host, config, hook }
    }

    /// Replace the default baseline hook.
    pub fn with_hook(mut self, hook: Box<dyn StyleAdjustment>) -> Self {
        self.hook = hook;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Export `target` from the live document as an image.
    pub async fn export(
        &self,
        live: &Document,
        target: &CaptureTarget,
        theme: &Theme,
        options: &ExportOptions,
    ) -> ExportResult {
        let result = self.run(live, target, theme, options).await;
        match &result {
            Ok(success) => info!(
                "Exported {} ({}x{}, {})",
                success.file_name, success.encoded.width, success.encoded.height, success.encoded.mime
            ),
            Err(err) => warn!("Export failed: {}", err),
        }
        result.into()
    }

    async fn run(
        &self,
        live: &Document,
        target: &CaptureTarget,
        theme: &Theme,
        options: &ExportOptions,
    ) -> Result<ExportSuccess> {
        let options = options.clamped();

        let mut surface = clone_target(live, target, theme)?;
        let layout = stabilize(&mut surface, &self.host, &self.config.layout, &options);

        let styles = surface.computed_styles();
        let fonts = wait_for_fonts(&surface, &styles, &self.host, self.config.font_timeout).await;

        let native_scale = match self.config.raster_mode {
            RasterMode::Native if self.host.capabilities().native_scaling => options.scale,
            _ => 1,
        };
        let capture_config = CaptureConfig {
            background: resolve_background(options.background.as_deref(), theme),
            scale: native_scale,
            use_cors: self.config.use_cors,
            allow_taint: self.config.allow_taint,
            width: layout.width,
            height: layout.height,
        };
        let capture = rasterize(&mut surface, &self.host, layout, &capture_config, self.hook.as_ref())?;
        let image = composite(capture, options.scale);

        let encoded = encode(&image, options.format, options.quality)?;
        let file_name = export_file_name(&theme.id, surface.debug_active(), options.format, Utc::now());

        Ok(ExportSuccess {
            encoded,
            image,
            file_name,
            fonts,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
