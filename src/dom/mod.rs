//! Preview Tree for Markshot
//!
//! A small arena-backed DOM: the markdown collaborator builds one of these
//! for the live preview, and the exporter deep-copies the capture target
//! into a second, detached `Document` before touching any styles.
//!
//! # Architecture
//!
//! - `node.rs` - `NodeId`, `Element`, `InlineStyle`
//! - `debug.rs` - margin/padding debug overlay toggles

pub mod debug;
mod node;

pub use node::{Element, InlineStyle, Node, NodeId, NodeKind};

use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Stylesheets
// ─────────────────────────────────────────────────────────────────────────────

/// A stylesheet attached to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSheet {
    /// A `<style>` element; its text may carry themed variables.
    Inline { id: Option<String>, css: String },
    /// A `<link rel="stylesheet">` whose content was fetched by the host.
    Linked { href: String, css: String },
}

impl StyleSheet {
    pub fn inline(css: impl Into<String>) -> Self {
        StyleSheet::Inline {
            id: None,
            css: css.into(),
        }
    }

    pub fn inline_with_id(id: &str, css: impl Into<String>) -> Self {
        StyleSheet::Inline {
            id: Some(id.to_string()),
            css: css.into(),
        }
    }

    pub fn css(&self) -> &str {
        match self {
            StyleSheet::Inline { css, .. } | StyleSheet::Linked { css, .. } => css,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            StyleSheet::Inline { id, .. } => id.as_deref(),
            StyleSheet::Linked { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// An arena of nodes rooted at a `<body>` element, plus its stylesheets.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
    stylesheets: Vec<StyleSheet>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only `<body>`.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(Element::new("body")),
                parent: None,
                children: Vec::new(),
            }],
            body: NodeId(0),
            stylesheets: Vec::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.nodes[old_parent.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Create an element and append it to `parent` in one step.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Create a text node and append it to `parent` in one step.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0).and_then(Node::as_element_mut)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Pre-order list of `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Elements in the subtree (including `root`) whose tag is in `tags`.
    pub fn elements_by_tag(&self, root: NodeId, tags: &[&str]) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| {
                self.element(*id)
                    .is_some_and(|el| tags.contains(&el.tag.as_str()))
            })
            .collect()
    }

    /// Find the element carrying `id="<id>"` anywhere below `<body>`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|n| self.element(*n).and_then(Element::id) == Some(id))
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, root: NodeId) -> String {
        self.descendants(root)
            .into_iter()
            .filter_map(|id| self.nodes[id.0].as_text())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stylesheets
    // ─────────────────────────────────────────────────────────────────────────

    pub fn stylesheets(&self) -> &[StyleSheet] {
        &self.stylesheets
    }

    pub fn add_stylesheet(&mut self, sheet: StyleSheet) {
        self.stylesheets.push(sheet);
    }

    /// Remove an inline stylesheet by its id, returning whether one existed.
    pub fn remove_stylesheet(&mut self, id: &str) -> bool {
        let before = self.stylesheets.len();
        self.stylesheets.retain(|s| s.id() != Some(id));
        before != self.stylesheets.len()
    }

    pub fn has_stylesheet(&self, id: &str) -> bool {
        self.stylesheets.iter().any(|s| s.id() == Some(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cloning & Serialization
    // ─────────────────────────────────────────────────────────────────────────

    /// Deep-copy the subtree at `source_root` of `source` under `parent` in
    /// this document, returning the id of the copied root.
    ///
    /// Attributes, classes and inline styles are copied verbatim.
    pub fn import_subtree(&mut self, source: &Document, source_root: NodeId, parent: NodeId) -> NodeId {
        let copy = self.push(source.node(source_root).kind.clone());
        self.append_child(parent, copy);
        for child in source.children(source_root) {
            self.import_subtree(source, *child, copy);
        }
        copy
    }

    /// Stable text describing every inline style and class list in the
    /// subtree, one element per line. Two calls return equal strings iff
    /// no observable styling changed in between.
    pub fn serialize_styles(&self, root: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(root) {
            if let Some(el) = self.element(id) {
                let _ = writeln!(
                    out,
                    "{}#{} [{}] {{{}}}",
                    el.tag,
                    id.0,
                    el.classes.join(" "),
                    el.style.to_css_text()
                );
            }
        }
        out
    }

    /// Serialize the subtree as HTML (used for diagnostics and tests).
    pub fn outer_html(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.write_html(root, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element(el) => {
                let _ = write!(out, "{}", el);
                if is_void(&el.tag) {
                    return;
                }
                for child in &self.nodes[id.0].children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", el.tag);
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr" | "input" | "meta" | "link")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let preview = doc.append_element(body, "div");
        doc.element_mut(preview)
            .unwrap()
            .set_attr("id", "preview-content");
        let h1 = doc.append_element(preview, "h1");
        doc.append_text(h1, "Title");
        let p = doc.append_element(preview, "p");
        doc.append_text(p, "Hello ");
        let strong = doc.append_element(p, "strong");
        doc.append_text(strong, "world");
        (doc, preview)
    }

    #[test]
    fn test_get_element_by_id() {
        let (doc, preview) = sample();
        assert_eq!(doc.get_element_by_id("preview-content"), Some(preview));
        assert_eq!(doc.get_element_by_id("missing"), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let (doc, preview) = sample();
        let tags: Vec<_> = doc
            .descendants(preview)
            .into_iter()
            .filter_map(|id| doc.element(id).map(|e| e.tag.clone()))
            .collect();
        assert_eq!(tags, vec!["div", "h1", "p", "strong"]);
    }

    #[test]
    fn test_text_content() {
        let (doc, preview) = sample();
        assert_eq!(doc.text_content(preview), "TitleHello world");
    }

    #[test]
    fn test_ancestors() {
        let (doc, preview) = sample();
        let strong = doc.elements_by_tag(preview, &["strong"])[0];
        let chain: Vec<_> = doc.ancestors(strong).collect();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[2], doc.body());
    }

    #[test]
    fn test_import_subtree_is_independent() {
        let (doc, preview) = sample();
        let mut copy = Document::new();
        let body = copy.body();
        let root = copy.import_subtree(&doc, preview, body);
        copy.element_mut(root).unwrap().style.set("width", "800px");

        assert_eq!(copy.text_content(root), doc.text_content(preview));
        assert!(doc.element(preview).unwrap().style.is_empty());
    }

    #[test]
    fn test_serialize_styles_detects_changes() {
        let (mut doc, preview) = sample();
        let before = doc.serialize_styles(preview);
        doc.element_mut(preview).unwrap().style.set("width", "1px");
        assert_ne!(before, doc.serialize_styles(preview));
        doc.element_mut(preview).unwrap().style.remove("width");
        assert_eq!(before, doc.serialize_styles(preview));
    }

    #[test]
    fn test_outer_html() {
        let (doc, preview) = sample();
        let html = doc.outer_html(preview);
        assert!(html.starts_with(r#"<div id="preview-content">"#));
        assert!(html.contains("<strong>world</strong>"));
    }

    #[test]
    fn test_stylesheet_management() {
        let mut doc = Document::new();
        doc.add_stylesheet(StyleSheet::inline_with_id("debug-styles", "* {}"));
        assert!(doc.has_stylesheet("debug-styles"));
        assert!(doc.remove_stylesheet("debug-styles"));
        assert!(!doc.remove_stylesheet("debug-styles"));
    }
}
