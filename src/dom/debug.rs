//! Margin/padding debug overlay
//!
//! Toggling the overlay marks the capture target and its text blocks with
//! classes that a dedicated stylesheet outlines. The overlay is part of the
//! tree, so an export taken while it is active captures the outlines too.

use log::debug;

use super::{Document, NodeId, StyleSheet};

/// Id of the stylesheet installed on first activation.
pub const DEBUG_STYLESHEET_ID: &str = "debug-styles";
/// Class whose presence on the target means "overlay active".
pub const DEBUG_MARGINS_CLASS: &str = "debug-margins";
pub const DEBUG_PADDING_CLASS: &str = "debug-padding";
pub const DEBUG_BASELINE_CLASS: &str = "debug-text-baseline";
pub const DEBUG_MARGIN_ATTR: &str = "data-debug-margin";

const TEXT_BLOCK_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li"];

const DEBUG_CSS: &str = r#"
.debug-margins * {
    outline: 1px dotted red !important;
}

.debug-padding * {
    box-shadow: inset 0 0 0 1px rgba(0, 255, 0, 0.6) !important;
}

.debug-margins li,
.debug-margins p,
.debug-margins h1,
.debug-margins h2,
.debug-margins h3 {
    position: relative !important;
}

.debug-text-baseline {
    text-decoration: underline;
    text-decoration-color: blue;
}
"#;

/// Whether the debug overlay is active on `target`.
pub fn is_debug_active(doc: &Document, target: NodeId) -> bool {
    doc.element(target)
        .is_some_and(|el| el.has_class(DEBUG_MARGINS_CLASS))
}

/// Toggle the overlay on `target`, returning whether it is now active.
pub fn toggle_debug_overlay(doc: &mut Document, target: NodeId) -> bool {
    if !doc.has_stylesheet(DEBUG_STYLESHEET_ID) {
        doc.add_stylesheet(StyleSheet::inline_with_id(DEBUG_STYLESHEET_ID, DEBUG_CSS));
    }

    let active = match doc.element_mut(target) {
        Some(el) => {
            el.toggle_class(DEBUG_PADDING_CLASS);
            el.toggle_class(DEBUG_MARGINS_CLASS)
        }
        None => return false,
    };

    for id in doc.elements_by_tag(target, TEXT_BLOCK_TAGS) {
        let margin = describe_margin(doc, id);
        if let Some(el) = doc.element_mut(id) {
            if el.toggle_class(DEBUG_BASELINE_CLASS) {
                el.set_attr(DEBUG_MARGIN_ATTR, &margin);
            } else {
                el.remove_attr(DEBUG_MARGIN_ATTR);
            }
        }
    }

    debug!("Debug overlay {}", if active { "enabled" } else { "disabled" });
    active
}

/// Remove every overlay toggle below `target` and the overlay stylesheet.
pub fn remove_debug_overlay(doc: &mut Document, target: NodeId) {
    if let Some(el) = doc.element_mut(target) {
        el.remove_class(DEBUG_MARGINS_CLASS);
        el.remove_class(DEBUG_PADDING_CLASS);
    }
    for id in doc.elements_by_tag(target, TEXT_BLOCK_TAGS) {
        if let Some(el) = doc.element_mut(id) {
            el.remove_class(DEBUG_BASELINE_CLASS);
            el.remove_attr(DEBUG_MARGIN_ATTR);
        }
    }
    doc.remove_stylesheet(DEBUG_STYLESHEET_ID);
}

fn describe_margin(doc: &Document, id: NodeId) -> String {
    doc.element(id)
        .and_then(|el| el.style.get("margin"))
        .unwrap_or("stylesheet")
        .to_string()
}
