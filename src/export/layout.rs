//! Layout stabilization
//!
//! Settles the clone's capture dimensions before any pixels are read. The
//! fixed-width policy makes output width independent of the viewport; the
//! natural policy lets the content decide.

use log::debug;

use super::clone::{offset_height, CloneSurface};
use super::host::{HostLayout, RenderHost};
use super::options::{ExportOptions, LayoutPolicy};
use super::snapshot::StyleGuard;
use crate::style::compute_styles;

pub const DEFAULT_CANONICAL_WIDTH: u32 = 800;
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Layout inputs that come from configuration rather than the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub policy: LayoutPolicy,
    /// Maximum content width of the editor's preview pane
    pub canonical_width: u32,
    /// Width available to the natural-flow policy
    pub viewport_width: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            policy: LayoutPolicy::default(),
            canonical_width: DEFAULT_CANONICAL_WIDTH,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
        }
    }
}

/// Capture dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizedLayout {
    pub width: u32,
    pub height: u32,
}

/// Resolve the capture size of `surface` under `config`.
///
/// Explicit `options.width`/`options.height` win over whatever the policy
/// measured. The clone root's inline style is unchanged on return.
pub fn stabilize<H: RenderHost + ?Sized>(
    surface: &mut CloneSurface,
    host: &H,
    config: &LayoutConfig,
    options: &ExportOptions,
) -> StabilizedLayout {
    let root = surface.root();

    let (width, height) = match config.policy {
        LayoutPolicy::FixedWidth => {
            let width = options.width.unwrap_or(config.canonical_width).max(1);
            let mut guard = StyleGuard::new(surface.document_mut());
            guard.set(root, "width", &format!("{}px", width));
            guard.set(root, "height", "auto");
            let height = offset_height(guard.document(), root, host, width as f32);
            (width, height)
        }
        LayoutPolicy::Natural => {
            let available = options.width.unwrap_or(config.viewport_width).max(1);
            let doc = surface.document();
            let styles = compute_styles(doc);
            let layout = host.layout(doc, &styles, root, available as f32);
            let width = options
                .width
                .unwrap_or_else(|| layout.width().ceil() as u32);
            (width, layout.height())
        }
    };

    let height = options
        .height
        .unwrap_or_else(|| height.ceil() as u32)
        .max(1);
    let stabilized = StabilizedLayout {
        width: width.max(1),
        height,
    };
    debug!(
        "Stabilized layout ({}): {}x{}",
        config.policy.label(),
        stabilized.width,
        stabilized.height
    );
    stabilized
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::clone::{clone_target, CaptureTarget};
    use crate::export::software::SoftwareHost;
    use crate::preview::render_preview;
    use crate::theme::presets;

    fn surface(markdown: &str) -> CloneSurface {
        let theme = presets::light();
        let live = render_preview(markdown, &theme);
        clone_target(&live, &CaptureTarget::preview(), &theme).unwrap()
    }

    #[test]
    fn test_fixed_width_is_viewport_independent() {
        let host = SoftwareHost::new();
        let options = ExportOptions::default();
        let mut narrow = LayoutConfig::default();
        narrow.viewport_width = 300;
        let mut wide = LayoutConfig::default();
        wide.viewport_width = 1600;

        let a = stabilize(&mut surface("# Title\n\nBody text"), &host, &narrow, &options);
        let b = stabilize(&mut surface("# Title\n\nBody text"), &host, &wide, &options);
        assert_eq!(a, b);
        assert_eq!(a.width, DEFAULT_CANONICAL_WIDTH);
        assert!(a.height > 0);
    }

    #[test]
    fn test_fixed_width_restores_clone_root() {
        let host = SoftwareHost::new();
        let mut s = surface("text");
        let before = s.document().serialize_styles(s.root());
        stabilize(&mut s, &host, &LayoutConfig::default(), &ExportOptions::default());
        assert_eq!(s.document().serialize_styles(s.root()), before);
    }

    #[test]
    fn test_longer_content_is_taller() {
        let host = SoftwareHost::new();
        let config = LayoutConfig::default();
        let options = ExportOptions::default();
        let short = stabilize(&mut surface("one"), &host, &config, &options);
        let long = stabilize(&mut surface("one\n\ntwo\n\nthree\n\nfour"), &host, &config, &options);
        assert!(long.height > short.height);
    }

    #[test]
    fn test_natural_policy_and_explicit_size() {
        let host = SoftwareHost::new();
        let config = LayoutConfig {
            policy: LayoutPolicy::Natural,
            canonical_width: 800,
            viewport_width: 500,
        };
        let natural = stabilize(&mut surface("text"), &host, &config, &ExportOptions::default());
        assert!(natural.width <= 500);

        let options = ExportOptions::default().with_size(Some(640), Some(480));
        let explicit = stabilize(&mut surface("text"), &host, &config, &options);
        assert_eq!(explicit, StabilizedLayout { width: 640, height: 480 });
    }
}
