//! Node types for the preview tree

use std::collections::BTreeMap;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Node Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Index of a node inside its owning `Document` arena.
///
/// A `NodeId` is only meaningful for the document that produced it; a
/// cloned surface hands out its own ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Style
// ─────────────────────────────────────────────────────────────────────────────

/// An element's `style` attribute as an ordered list of declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    /// Parse `style` attribute text (`"width: 10px; color: red"`).
    pub fn parse(text: &str) -> Self {
        let mut style = Self::default();
        for decl in crate::style::css::parse_declarations(text) {
            if decl.important {
                style.set(&decl.name, &format!("{} !important", decl.value));
            } else {
                style.set(&decl.name, &decl.value);
            }
        }
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.declarations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, keeping its original position when it already exists.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.declarations.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    /// Remove a property, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let pos = self.declarations.iter().position(|(n, _)| *n == name)?;
        Some(self.declarations.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialize back to attribute text.
    pub fn to_css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(n, v)| format!("{}: {};", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Element
// ─────────────────────────────────────────────────────────────────────────────

/// An element node's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes other than `class` and `style`
    pub attributes: BTreeMap<String, String>,
    /// Class list, in insertion order
    pub classes: Vec<String>,
    /// Inline `style` declarations
    pub style: InlineStyle,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            style: InlineStyle::default(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Set an attribute. `class` and `style` are routed to their structured
    /// representations.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match name {
            "class" => {
                self.classes = value.split_whitespace().map(str::to_string).collect();
            }
            "style" => self.style = InlineStyle::parse(value),
            _ => {
                self.attributes.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    /// Toggle a class, returning whether it is now present.
    pub fn toggle_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            self.remove_class(class);
            false
        } else {
            self.add_class(class);
            true
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

/// A node in the arena with its tree links.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element(_) => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        if !self.classes.is_empty() {
            write!(f, " class=\"{}\"", self.classes.join(" "))?;
        }
        if !self.style.is_empty() {
            write!(f, " style=\"{}\"", self.style.to_css_text())?;
        }
        write!(f, ">")
    }
}
