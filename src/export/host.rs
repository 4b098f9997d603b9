//! Host rendering surface
//!
//! The exporter never lays out or paints anything itself. It drives a
//! `RenderHost`, which reproduces CSS layout for a detached tree, loads
//! fonts, and exposes the rasterization primitive.

use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};

use super::clone::CloneSurface;
use crate::dom::{Document, NodeId};
use crate::error::CaptureError;
use crate::style::StyleMap;

// ─────────────────────────────────────────────────────────────────────────────
// Host Types
// ─────────────────────────────────────────────────────────────────────────────

/// What a host can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    /// Whether `capture` honors `CaptureConfig::scale`
    pub native_scaling: bool,
}

/// Outcome of one font load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontLoad {
    Loaded,
    Failed(String),
}

/// Size of a laid-out tree.
pub trait HostLayout {
    /// Border-box width of the laid-out root in CSS pixels
    fn width(&self) -> f32;
    /// Border-box height of the laid-out root in CSS pixels
    fn height(&self) -> f32;
}

/// Settings handed to the rasterization primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Canvas fill behind the content
    pub background: Rgba<u8>,
    /// Requested native oversampling factor
    pub scale: u32,
    /// Request cross-origin assets with CORS
    pub use_cors: bool,
    /// Allow tainted pixels instead of failing
    pub allow_taint: bool,
    /// Capture width in CSS pixels
    pub width: u32,
    /// Capture height in CSS pixels
    pub height: u32,
}

/// A captured pixel buffer.
#[derive(Debug, Clone)]
pub struct Capture {
    pub image: RgbaImage,
    /// Oversampling actually applied by the host
    pub native_scale: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Render Host
// ─────────────────────────────────────────────────────────────────────────────

/// A rendering surface able to lay out, load fonts for, and capture a tree.
pub trait RenderHost: Send + Sync {
    type Layout: HostLayout;

    fn capabilities(&self) -> HostCapabilities;

    /// Lay out the subtree at `root` with `width` CSS pixels available.
    fn layout(&self, doc: &Document, styles: &StyleMap, root: NodeId, width: f32) -> Self::Layout;

    /// Start loading a web font family. The returned future owns all it needs.
    fn load_font(&self, family: &str) -> BoxFuture<'static, FontLoad>;

    /// Read pixels for a laid-out surface.
    fn capture(
        &self,
        surface: &CloneSurface,
        styles: &StyleMap,
        layout: &Self::Layout,
        config: &CaptureConfig,
    ) -> Result<Capture, CaptureError>;
}
