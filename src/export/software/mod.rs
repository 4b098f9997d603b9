//! Built-in software render host
//!
//! A self-contained `RenderHost` that needs no browser: block and inline
//! flow layout over computed styles, bitmap-glyph text, and an in-memory
//! asset store. It backs the command-line exporter and the test suite.

pub mod assets;
pub mod layout;
pub mod paint;

use std::collections::HashMap;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use image::RgbaImage;
use log::debug;

use self::assets::{Asset, AssetStore};
use self::layout::{layout_tree, SoftwareLayout};
use self::paint::{build_display_list, Canvas, ImagePolicy};
use super::clone::CloneSurface;
use super::host::{Capture, CaptureConfig, FontLoad, HostCapabilities, RenderHost};
use crate::dom::{Document, NodeId};
use crate::error::CaptureError;
use crate::style::css::normalize_family;
use crate::style::StyleMap;

/// How a registered web font behaves when loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontBehavior {
    Ready,
    Delayed(Duration),
    /// The load never settles
    Never,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SoftwareHost {
    fonts: HashMap<String, FontBehavior>,
    assets: AssetStore,
    native_scaling: bool,
}

impl Default for SoftwareHost {
    fn default() -> Self {
        Self {
            fonts: HashMap::new(),
            assets: AssetStore::default(),
            native_scaling: true,
        }
    }
}

impl SoftwareHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a web font family. Unregistered families load immediately.
    pub fn with_font(mut self, family: &str, behavior: FontBehavior) -> Self {
        self.fonts.insert(normalize_family(family), behavior);
        self
    }

    /// Register an image source.
    pub fn with_asset(mut self, src: &str, asset: Asset) -> Self {
        self.assets.insert(src, asset);
        self
    }

    /// Ignore `CaptureConfig::scale`, always capturing at 1x.
    pub fn without_native_scaling(mut self) -> Self {
        self.native_scaling = false;
        self
    }
}

impl RenderHost for SoftwareHost {
    type Layout = SoftwareLayout;

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            native_scaling: self.native_scaling,
        }
    }

    fn layout(&self, doc: &Document, styles: &StyleMap, root: NodeId, width: f32) -> SoftwareLayout {
        layout_tree(doc, styles, &self.assets, root, width)
    }

    fn load_font(&self, family: &str) -> BoxFuture<'static, FontLoad> {
        match self.fonts.get(&normalize_family(family)).cloned() {
            None | Some(FontBehavior::Ready) => future::ready(FontLoad::Loaded).boxed(),
            Some(FontBehavior::Delayed(delay)) => async move {
                tokio::time::sleep(delay).await;
                FontLoad::Loaded
            }
            .boxed(),
            Some(FontBehavior::Never) => future::pending().boxed(),
            Some(FontBehavior::Failed(reason)) => future::ready(FontLoad::Failed(reason)).boxed(),
        }
    }

    fn capture(
        &self,
        surface: &CloneSurface,
        styles: &StyleMap,
        layout: &SoftwareLayout,
        config: &CaptureConfig,
    ) -> Result<Capture, CaptureError> {
        let scale = if self.native_scaling { config.scale.max(1) } else { 1 };
        let commands = build_display_list(
            surface.document(),
            styles,
            layout,
            &self.assets,
            ImagePolicy {
                use_cors: config.use_cors,
                allow_taint: config.allow_taint,
            },
        )?;
        debug!("Painting {} commands at {}x", commands.len(), scale);

        let mut canvas = Canvas::new(
            config.width,
            config.height,
            scale,
            (layout.root.x, layout.root.y),
            config.background,
        )?;
        canvas.execute(&commands);
        let image: RgbaImage = canvas.into_image();
        Ok(Capture {
            image,
            native_scale: scale,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::clone::{clone_target, CaptureTarget};
    use crate::preview::render_preview;
    use crate::theme::presets;
    use image::Rgba;

    fn config(width: u32, height: u32, scale: u32) -> CaptureConfig {
        CaptureConfig {
            background: Rgba([255, 255, 255, 255]),
            scale,
            use_cors: true,
            allow_taint: false,
            width,
            height,
        }
    }

    fn capture_markdown(host: &SoftwareHost, markdown: &str, cfg: &CaptureConfig) -> Result<Capture, CaptureError> {
        let theme = presets::light();
        let live = render_preview(markdown, &theme);
        let surface = clone_target(&live, &CaptureTarget::preview(), &theme).unwrap();
        let styles = surface.computed_styles();
        let layout = host.layout(surface.document(), &styles, surface.root(), cfg.width as f32);
        host.capture(&surface, &styles, &layout, cfg)
    }

    #[test]
    fn test_native_scale_applied() {
        let host = SoftwareHost::new();
        let capture = capture_markdown(&host, "Hello", &config(100, 50, 2)).unwrap();
        assert_eq!(capture.native_scale, 2);
        assert_eq!(capture.image.dimensions(), (200, 100));
    }

    #[test]
    fn test_without_native_scaling() {
        let host = SoftwareHost::new().without_native_scaling();
        assert!(!host.capabilities().native_scaling);
        let capture = capture_markdown(&host, "Hello", &config(100, 50, 3)).unwrap();
        assert_eq!(capture.native_scale, 1);
        assert_eq!(capture.image.dimensions(), (100, 50));
    }

    #[test]
    fn test_text_is_painted() {
        let host = SoftwareHost::new();
        let capture = capture_markdown(&host, "Hello world", &config(300, 80, 1)).unwrap();
        let background = Rgba([255, 255, 255, 255]);
        assert!(capture.image.pixels().any(|p| *p != background));
    }

    #[test]
    fn test_tainted_image_fails_unless_allowed() {
        let src = "https://cdn.example.com/pic.png";
        let host = SoftwareHost::new()
            .with_asset(src, Asset::cross_origin(RgbaImage::new(4, 4), false));
        let markdown = format!("![pic]({})", src);

        let err = capture_markdown(&host, &markdown, &config(200, 100, 1)).unwrap_err();
        assert_eq!(err, CaptureError::Tainted { src: src.to_string() });

        let mut allowed = config(200, 100, 1);
        allowed.allow_taint = true;
        assert!(capture_markdown(&host, &markdown, &allowed).is_ok());
    }

    #[test]
    fn test_missing_image_is_not_fatal() {
        let host = SoftwareHost::new();
        let result = capture_markdown(&host, "![gone](missing.png)", &config(200, 100, 1));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_font_behaviors() {
        let host = SoftwareHost::new()
            .with_font("'Brand'", FontBehavior::Failed("404".into()))
            .with_font("Slow", FontBehavior::Delayed(Duration::from_millis(1)));
        assert_eq!(host.load_font("brand").await, FontLoad::Failed("404".into()));
        assert_eq!(host.load_font("Slow").await, FontLoad::Loaded);
        assert_eq!(host.load_font("Unregistered").await, FontLoad::Loaded);
    }
}
