//! Detached capture surface
//!
//! The live preview is only ever read. Everything the exporter prepares
//! happens on a `CloneSurface`: a separate `Document` that carries resolved
//! copies of the live stylesheets and a deep copy of the capture target.

use log::debug;

use super::host::{HostLayout, RenderHost};
use crate::dom::{debug as overlay, Document, NodeId, StyleSheet};
use crate::error::{Error, Result};
use crate::preview::PREVIEW_CONTENT_ID;
use crate::style::{compute_styles, resolve_themed_variables, StyleMap};
use crate::theme::Theme;

/// Computed properties of the live root copied inline onto the clone root.
const PINNED_PROPERTIES: &[&str] = &[
    "background-color",
    "color",
    "font-family",
    "font-size",
    "line-height",
    "padding",
    "margin",
    "max-width",
    "display",
    "box-sizing",
];

// ─────────────────────────────────────────────────────────────────────────────
// Capture Target
// ─────────────────────────────────────────────────────────────────────────────

/// The subtree to export, addressed by element id so the exporter always
/// finds the current preview even after it was re-rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureTarget {
    pub id: String,
}

impl CaptureTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The markdown preview container.
    pub fn preview() -> Self {
        Self::new(PREVIEW_CONTENT_ID)
    }

    /// Locate the target in `doc`.
    pub fn locate(&self, doc: &Document) -> Option<NodeId> {
        doc.get_element_by_id(&self.id)
    }
}

impl Default for CaptureTarget {
    fn default() -> Self {
        Self::preview()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clone Surface
// ─────────────────────────────────────────────────────────────────────────────

/// An isolated copy of the capture target ready for preparation.
#[derive(Debug, Clone)]
pub struct CloneSurface {
    document: Document,
    root: NodeId,
    debug_active: bool,
}

impl CloneSurface {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Copied capture target inside `document()`.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the debug overlay was active on the live target.
    pub fn debug_active(&self) -> bool {
        self.debug_active
    }

    pub fn computed_styles(&self) -> StyleMap {
        compute_styles(&self.document)
    }

    /// Flush layout and read the root's height, like reading `offsetHeight`.
    pub fn offset_height<H: RenderHost + ?Sized>(&self, host: &H, available_width: f32) -> f32 {
        offset_height(&self.document, self.root, host, available_width)
    }
}

/// Lay out `root` in `doc` and return its height.
pub(crate) fn offset_height<H: RenderHost + ?Sized>(
    doc: &Document,
    root: NodeId,
    host: &H,
    available_width: f32,
) -> f32 {
    let styles = compute_styles(doc);
    host.layout(doc, &styles, root, available_width).height()
}

// ─────────────────────────────────────────────────────────────────────────────
// Cloning
// ─────────────────────────────────────────────────────────────────────────────

/// Build a detached copy of `target` from the live tree.
///
/// Fails with `TargetNotFound` before doing anything else when the target
/// id is missing. Stylesheets are attached before the subtree is copied;
/// inline sheets have `theme`'s variables resolved, linked sheets are kept
/// as fetched. Debug overlay classes and attributes survive the copy.
pub fn clone_target(live: &Document, target: &CaptureTarget, theme: &Theme) -> Result<CloneSurface> {
    let live_root = target.locate(live).ok_or_else(|| Error::TargetNotFound {
        id: target.id.clone(),
    })?;

    let mut document = Document::new();
    for sheet in live.stylesheets() {
        let copy = match sheet {
            StyleSheet::Inline { id, css } => StyleSheet::Inline {
                id: id.clone(),
                css: resolve_themed_variables(css, theme),
            },
            StyleSheet::Linked { .. } => sheet.clone(),
        };
        document.add_stylesheet(copy);
    }

    let body = document.body();
    let root = document.import_subtree(live, live_root, body);

    // Pin what the live root inherits from ancestors the clone does not have
    let live_styles = compute_styles(live);
    if let (Some(computed), Some(el)) = (live_styles.get(live_root), document.element_mut(root)) {
        for property in PINNED_PROPERTIES {
            let value = match *property {
                "padding" | "margin" => {
                    let sides: Vec<&str> = ["top", "right", "bottom", "left"]
                        .iter()
                        .map(|side| computed.get_or(&format!("{}-{}", property, side), "0"))
                        .collect();
                    Some(sides.join(" "))
                }
                _ => computed.get(property).map(str::to_string),
            };
            if let Some(value) = value {
                el.style.set(property, &value);
            }
        }
        el.style.set("height", "auto");
    }

    let debug_active = overlay::is_debug_active(live, live_root);
    debug!(
        "Cloned capture target '#{}' ({} nodes, debug overlay: {})",
        target.id,
        document.len(),
        debug_active
    );

    Ok(CloneSurface {
        document,
        root,
        debug_active,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
