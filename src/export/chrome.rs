//! Headless Chrome render host
//!
//! Loads the detached tree into a real browser tab through the DevTools
//! protocol, so layout, web fonts and text shaping come from Blink. The
//! page is rebuilt from the surface on every call, which keeps style
//! borrowing on the clone visible to the capture.
//!
//! Enabled with the `chrome` feature.

use std::sync::Arc;

use base64::Engine;
use futures::FutureExt;
use futures::future::BoxFuture;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use image::Rgba;
use log::{debug, warn};
use serde::Deserialize;

use super::clone::CloneSurface;
use super::host::{Capture, CaptureConfig, FontLoad, HostCapabilities, HostLayout, RenderHost};
use crate::dom::{Document, NodeId};
use crate::error::CaptureError;
use crate::style::StyleMap;

/// Id of the wrapper that fixes the available width around the root.
const FRAME_ID: &str = "markshot-frame";

/// Measures the root's border box in page coordinates.
const MEASURE_SCRIPT: &str = r#"
(function() {
    const frame = document.getElementById('markshot-frame');
    const root = frame ? frame.firstElementChild : null;
    if (!root) { return JSON.stringify({ left: 0, top: 0, width: 0, height: 0 }); }
    const r = root.getBoundingClientRect();
    return JSON.stringify({ left: r.left + window.scrollX, top: r.top + window.scrollY, width: r.width, height: r.height });
})()
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Root box as measured by the browser, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ChromeLayout {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl HostLayout for ChromeLayout {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host
// ─────────────────────────────────────────────────────────────────────────────

/// A `RenderHost` driving one headless Chrome tab.
pub struct ChromeHost {
    // Keeps the browser process alive for the tab
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeHost {
    /// Launch headless Chrome with a `width`x`height` window.
    pub fn launch(width: u32, height: u32) -> Result<Self, CaptureError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((width, height)))
            .build()
            .map_err(|e| CaptureError::Host(format!("Failed to build launch options: {}", e)))?;
        let browser =
            Browser::new(options).map_err(|e| CaptureError::Host(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| CaptureError::Host(format!("Failed to create tab: {}", e)))?;
        Ok(Self { _browser: browser, tab })
    }

    /// Navigate to `html` and measure the root.
    fn load_page(&self, html: &str) -> Result<ChromeLayout, String> {
        let url = format!(
            "data:text/html;charset=utf-8;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(html)
        );
        self.tab
            .navigate_to(&url)
            .map_err(|e| format!("Navigation failed: {}", e))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| format!("Wait for navigation failed: {}", e))?;

        let eval = self
            .tab
            .evaluate(MEASURE_SCRIPT, false)
            .map_err(|e| format!("Measurement failed: {}", e))?;
        let text = eval
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| "No value returned from measurement".to_string())?;
        serde_json::from_str(text).map_err(|e| format!("Bad measurement '{}': {}", text, e))
    }
}

impl RenderHost for ChromeHost {
    type Layout = ChromeLayout;

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities { native_scaling: true }
    }

    fn layout(&self, doc: &Document, _styles: &StyleMap, root: NodeId, width: f32) -> ChromeLayout {
        match self.load_page(&page_html(doc, root, width, None)) {
            Ok(layout) => layout,
            Err(e) => {
                warn!("Chrome layout failed: {}", e);
                ChromeLayout::default()
            }
        }
    }

    fn load_font(&self, family: &str) -> BoxFuture<'static, FontLoad> {
        let tab = Arc::clone(&self.tab);
        let spec = serde_json::Value::String(format!("16px \"{}\"", family.replace('"', "")));
        let script = format!("document.fonts.load({}).then(faces => faces.length)", spec);
        async move {
            match tokio::task::spawn_blocking(move || tab.evaluate(&script, true)).await {
                Ok(Ok(_)) => FontLoad::Loaded,
                Ok(Err(e)) => FontLoad::Failed(format!("Font load failed: {}", e)),
                Err(e) => FontLoad::Failed(format!("Font load task failed: {}", e)),
            }
        }
        .boxed()
    }

    fn capture(
        &self,
        surface: &CloneSurface,
        _styles: &StyleMap,
        layout: &ChromeLayout,
        config: &CaptureConfig,
    ) -> Result<Capture, CaptureError> {
        let html = page_html(surface.document(), surface.root(), layout.width, Some(config.background));
        let measured = self.load_page(&html).map_err(CaptureError::Host)?;
        let scale = config.scale.max(1);
        debug!(
            "Chrome capture {}x{} at ({}, {}) scale {}",
            config.width, config.height, measured.left, measured.top, scale
        );

        let clip = Page::Viewport {
            x: measured.left as f64,
            y: measured.top as f64,
            width: config.width as f64,
            height: config.height as f64,
            scale: scale as f64,
        };
        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| CaptureError::Host(format!("Screenshot failed: {}", e)))?;
        let image = image::load_from_memory(&png)
            .map_err(|e| CaptureError::Host(format!("Undecodable screenshot: {}", e)))?
            .to_rgba8();

        Ok(Capture {
            image,
            native_scale: scale,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Page Building
// ─────────────────────────────────────────────────────────────────────────────

/// A standalone page holding the document's stylesheets and the subtree at
/// `root`, wrapped in a frame `width` CSS pixels wide.
pub(crate) fn page_html(doc: &Document, root: NodeId, width: f32, background: Option<Rgba<u8>>) -> String {
    let mut html = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    for sheet in doc.stylesheets() {
        html.push_str("<style>");
        // Keep stylesheet text from closing the element early
        html.push_str(&sheet.css().replace("</", "<\\/"));
        html.push_str("</style>");
    }

    let background = background
        .map(|Rgba([r, g, b, a])| format!("background: rgba({}, {}, {}, {:.3});", r, g, b, a as f32 / 255.0))
        .unwrap_or_default();
    html.push_str(&format!("</head><body style=\"margin: 0; {}\">", background));

    let frame_width = if width.is_finite() && width > 0.0 {
        format!(" style=\"width: {}px\"", width)
    } else {
        String::new()
    };
    html.push_str(&format!("<div id=\"{}\"{}>", FRAME_ID, frame_width));
    html.push_str(&doc.outer_html(root));
    html.push_str("</div></body></html>");
    html
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::StyleSheet;

    #[test]
    fn test_page_html_wraps_root_with_styles() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        doc.element_mut(root).unwrap().set_attr("id", "preview-content");
        doc.append_text(root, "a < b");
        doc.add_stylesheet(StyleSheet::inline("p::after { content: \"</style>\"; }"));

        let html = page_html(&doc, root, 640.0, Some(Rgba([255, 255, 255, 255])));
        assert!(html.contains("<div id=\"markshot-frame\" style=\"width: 640px\">"));
        assert!(html.contains("<\\/style>"));
        assert_eq!(html.matches("</style>").count(), 1);
        assert!(html.contains("a &lt; b"));
        assert!(html.contains("background: rgba(255, 255, 255, 1.000);"));
        assert!(html.ends_with("</div></body></html>"));
    }

    #[test]
    fn test_page_html_natural_width() {
        let doc = Document::new();
        let html = page_html(&doc, doc.body(), f32::INFINITY, None);
        assert!(html.contains("<div id=\"markshot-frame\">"));
        assert!(html.contains("<body style=\"margin: 0; \">"));
    }
}
