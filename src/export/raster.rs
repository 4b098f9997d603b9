//! Rasterization
//!
//! Drives the host's capture primitive over a stabilized clone. A
//! style-adjustment hook runs once against the clone right before pixels
//! are read; the default hook normalizes text rendering hints and vertical
//! alignment so captured text sits where the live preview shows it.

use image::Rgba;
use log::{debug, warn};

use super::clone::CloneSurface;
use super::host::{Capture, CaptureConfig, RenderHost};
use super::layout::StabilizedLayout;
use crate::error::CaptureError;
use crate::style::color::parse_color;
use crate::theme::Theme;

const TEXT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "span", "a", "strong", "em", "code", "pre",
    "td", "th", "blockquote", "del",
];

const FALLBACK_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

// ─────────────────────────────────────────────────────────────────────────────
// Background
// ─────────────────────────────────────────────────────────────────────────────

/// Canvas background: the explicit override when it parses, else the
/// theme's background. Transparency only comes from an explicit override.
pub fn resolve_background(override_color: Option<&str>, theme: &Theme) -> Rgba<u8> {
    if let Some(value) = override_color {
        match parse_color(value) {
            Some(color) => return color,
            None => warn!("Ignoring unparseable background override '{}'", value),
        }
    }
    match parse_color(&theme.colors.background) {
        Some(color) if color.0[3] > 0 => color,
        _ => {
            warn!(
                "Theme '{}' background '{}' is not opaque, using white",
                theme.id, theme.colors.background
            );
            FALLBACK_BACKGROUND
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Style Adjustment Hook
// ─────────────────────────────────────────────────────────────────────────────

/// Last-moment style correction applied to the clone before capture.
pub trait StyleAdjustment: Send + Sync {
    fn adjust(&self, surface: &mut CloneSurface);
}

/// Default hook: deterministic text hints and baseline normalization.
///
/// This is an approximation tuned per capture primitive. With a zero
/// `baseline_offset_px` vertical transforms are removed; otherwise text
/// elements are shifted by that many pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaselineHook {
    pub baseline_offset_px: f32,
}

impl BaselineHook {
    pub fn new(baseline_offset_px: f32) -> Self {
        Self { baseline_offset_px }
    }
}

impl StyleAdjustment for BaselineHook {
    fn adjust(&self, surface: &mut CloneSurface) {
        let root = surface.root();
        let doc = surface.document_mut();
        let mut targets = vec![root];
        targets.extend(doc.elements_by_tag(root, TEXT_TAGS));

        for id in targets {
            let Some(el) = doc.element_mut(id) else {
                continue;
            };
            el.style.set("text-rendering", "geometricPrecision");
            el.style.set("-webkit-font-smoothing", "antialiased");
            if id == root {
                continue;
            }
            el.style.set("vertical-align", "baseline");
            if self.baseline_offset_px != 0.0 {
                el.style
                    .set("transform", &format!("translateY({}px)", self.baseline_offset_px));
            } else if el.style.get("transform").is_some_and(is_vertical_transform) {
                el.style.remove("transform");
            }
        }
    }
}

fn is_vertical_transform(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    value.contains("translatey") || value.contains("translate(") || value.contains("translate3d")
}

// ─────────────────────────────────────────────────────────────────────────────
// Rasterize
// ─────────────────────────────────────────────────────────────────────────────

/// Run `hook` once, lay out the clone at the stabilized width and capture.
pub fn rasterize<H: RenderHost + ?Sized>(
    surface: &mut CloneSurface,
    host: &H,
    layout: StabilizedLayout,
    config: &CaptureConfig,
    hook: &dyn StyleAdjustment,
) -> Result<Capture, CaptureError> {
    hook.adjust(surface);

    let styles = surface.computed_styles();
    let laid_out = host.layout(surface.document(), &styles, surface.root(), layout.width as f32);
    let capture = host.capture(surface, &styles, &laid_out, config)?;

    if capture.image.width() == 0 || capture.image.height() == 0 {
        return Err(CaptureError::EmptySurface);
    }
    debug!(
        "Captured {}x{} pixels (native scale {})",
        capture.image.width(),
        capture.image.height(),
        capture.native_scale
    );
    Ok(capture)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
