//! Selector parsing and matching
//!
//! Selectors are parsed by the `selectors` crate and matched against the
//! arena `Document` through `ElementRef`. Interaction states (`:hover`,
//! `:focus`, ...) parse but never match: a capture is a still frame.

use std::borrow::Cow;
use std::fmt;

use log::debug;

use cssparser::{CowRcStr, ParseError, Parser, ParserInput, SourceLocation, ToCss};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::context::{QuirksMode, SelectorCaches};
use selectors::matching::{
    matches_selector, ElementSelectorFlags, MatchingContext, MatchingForInvalidation, MatchingMode,
    NeedsSelectorFlags,
};
use selectors::parser::{ParseRelative, SelectorImpl, SelectorList, SelectorParseErrorKind};
use selectors::OpaqueElement;

use crate::dom::{Document, Element, NodeId, NodeKind};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

// ─────────────────────────────────────────────────────────────────────────────
// Selector Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Owned string satisfying the `selectors` atom bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CssString(pub String);

impl From<&str> for CssString {
    fn from(s: &str) -> Self {
        CssString(s.to_string())
    }
}

impl AsRef<str> for CssString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for CssString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl ToCss for CssString {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        dest.write_str(&self.0)
    }
}

impl precomputed_hash::PrecomputedHash for CssString {
    fn precomputed_hash(&self) -> u32 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSelectors;

impl SelectorImpl for PreviewSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssString;
    type Identifier = CssString;
    type LocalName = CssString;
    type NamespacePrefix = CssString;
    type NamespaceUrl = CssString;
    type BorrowedLocalName = str;
    type BorrowedNamespaceUrl = str;

    type NonTSPseudoClass = PseudoClass;
    type PseudoElement = PseudoElement;
}

/// A parsed selector list.
pub type Selectors = SelectorList<PreviewSelectors>;

// ─────────────────────────────────────────────────────────────────────────────
// Pseudo-classes and Pseudo-elements
// ─────────────────────────────────────────────────────────────────────────────

/// Non tree-structural pseudo-classes. Structural ones (`:root`,
/// `:first-child`, `:nth-child()`, `:empty`, ...) are handled by `selectors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Hover,
    Active,
    Focus,
    FocusVisible,
    FocusWithin,
    Target,
    Link,
    AnyLink,
    Visited,
    Checked,
    Disabled,
    Enabled,
    /// `-webkit-`/`-moz-` extensions, kept so their rules parse
    Vendor(String),
}

impl selectors::parser::NonTSPseudoClass for PseudoClass {
    type Impl = PreviewSelectors;

    fn is_active_or_hover(&self) -> bool {
        matches!(self, PseudoClass::Active | PseudoClass::Hover)
    }

    fn is_user_action_state(&self) -> bool {
        matches!(
            self,
            PseudoClass::Hover | PseudoClass::Active | PseudoClass::Focus | PseudoClass::FocusVisible | PseudoClass::FocusWithin
        )
    }
}

impl ToCss for PseudoClass {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let name = match self {
            PseudoClass::Hover => "hover",
            PseudoClass::Active => "active",
            PseudoClass::Focus => "focus",
            PseudoClass::FocusVisible => "focus-visible",
            PseudoClass::FocusWithin => "focus-within",
            PseudoClass::Target => "target",
            PseudoClass::Link => "link",
            PseudoClass::AnyLink => "any-link",
            PseudoClass::Visited => "visited",
            PseudoClass::Checked => "checked",
            PseudoClass::Disabled => "disabled",
            PseudoClass::Enabled => "enabled",
            PseudoClass::Vendor(name) => name.as_str(),
        };
        write!(dest, ":{}", name)
    }
}

/// Pseudo-elements. Rules targeting them are parsed and then skipped by
/// the cascade, which only styles real elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {
    Before,
    After,
    Marker,
    Placeholder,
    Selection,
    FirstLine,
    FirstLetter,
    Vendor(String),
}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = PreviewSelectors;
}

impl ToCss for PseudoElement {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let name = match self {
            PseudoElement::Before => "before",
            PseudoElement::After => "after",
            PseudoElement::Marker => "marker",
            PseudoElement::Placeholder => "placeholder",
            PseudoElement::Selection => "selection",
            PseudoElement::FirstLine => "first-line",
            PseudoElement::FirstLetter => "first-letter",
            PseudoElement::Vendor(name) => name.as_str(),
        };
        write!(dest, "::{}", name)
    }
}

fn is_vendor_prefixed(name: &str) -> bool {
    name.starts_with("-webkit-") || name.starts_with("-moz-")
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) struct PreviewSelectorParser;

impl<'i> selectors::parser::Parser<'i> for PreviewSelectorParser {
    type Impl = PreviewSelectors;
    type Error = SelectorParseErrorKind<'i>;

    fn parse_is_and_where(&self) -> bool {
        true
    }

    fn parse_non_ts_pseudo_class(
        &self,
        location: SourceLocation,
        name: CowRcStr<'i>,
    ) -> Result<PseudoClass, ParseError<'i, Self::Error>> {
        let pseudo = match &*name.to_ascii_lowercase() {
            "hover" => PseudoClass::Hover,
            "active" => PseudoClass::Active,
            "focus" => PseudoClass::Focus,
            "focus-visible" => PseudoClass::FocusVisible,
            "focus-within" => PseudoClass::FocusWithin,
            "target" => PseudoClass::Target,
            "link" => PseudoClass::Link,
            "any-link" => PseudoClass::AnyLink,
            "visited" => PseudoClass::Visited,
            "checked" => PseudoClass::Checked,
            "disabled" => PseudoClass::Disabled,
            "enabled" => PseudoClass::Enabled,
            other if is_vendor_prefixed(other) => PseudoClass::Vendor(other.to_string()),
            _ => {
                return Err(location.new_custom_error(
                    SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name),
                ))
            }
        };
        Ok(pseudo)
    }

    fn parse_pseudo_element(
        &self,
        location: SourceLocation,
        name: CowRcStr<'i>,
    ) -> Result<PseudoElement, ParseError<'i, Self::Error>> {
        let pseudo = match &*name.to_ascii_lowercase() {
            "before" => PseudoElement::Before,
            "after" => PseudoElement::After,
            "marker" => PseudoElement::Marker,
            "placeholder" => PseudoElement::Placeholder,
            "selection" => PseudoElement::Selection,
            "first-line" => PseudoElement::FirstLine,
            "first-letter" => PseudoElement::FirstLetter,
            other if is_vendor_prefixed(other) => PseudoElement::Vendor(other.to_string()),
            _ => {
                return Err(location.new_custom_error(
                    SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name),
                ))
            }
        };
        Ok(pseudo)
    }
}

/// Parse a selector list from the tokens of `parser` up to its end.
pub(crate) fn parse_selector_list<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> Result<Selectors, ParseError<'i, SelectorParseErrorKind<'i>>> {
    SelectorList::parse(&PreviewSelectorParser, parser, ParseRelative::No)
}

/// Parse selector text such as `.markdown-content > p`. `None` when any
/// selector of the list is invalid, as a browser drops the whole rule.
pub fn parse_selector(text: &str) -> Option<Selectors> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|p| parse_selector_list(p))
        .map_err(|e| debug!("Dropping selector '{}': {:?}", text, e.kind))
        .ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Element Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// An element of a `Document` as seen by the selector engine.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
    element: &'a Element,
}

impl<'a> ElementRef<'a> {
    /// `None` for text nodes.
    pub fn new(doc: &'a Document, id: NodeId) -> Option<Self> {
        let element = doc.element(id)?;
        Some(Self { doc, id, element })
    }

    fn siblings(&self) -> &'a [NodeId] {
        match self.doc.parent(self.id) {
            Some(parent) => self.doc.children(parent),
            None => &[],
        }
    }

    fn attr_value(&self, name: &str) -> Option<Cow<'a, str>> {
        let el = self.element;
        match name {
            "class" => (!el.classes.is_empty()).then(|| Cow::Owned(el.classes.join(" "))),
            "style" => (!el.style.is_empty()).then(|| Cow::Owned(el.style.to_css_text())),
            _ => el
                .attributes
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| Cow::Borrowed(v.as_str())),
        }
    }

    fn is_form_control(&self) -> bool {
        matches!(
            self.element.tag.as_str(),
            "input" | "button" | "select" | "textarea" | "option" | "fieldset"
        )
    }
}

impl<'a> selectors::Element for ElementRef<'a> {
    type Impl = PreviewSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.element)
    }

    fn parent_element(&self) -> Option<Self> {
        ElementRef::new(self.doc, self.doc.parent(self.id)?)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let siblings = self.siblings();
        let pos = siblings.iter().position(|&s| s == self.id)?;
        siblings[..pos]
            .iter()
            .rev()
            .find_map(|&s| ElementRef::new(self.doc, s))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let siblings = self.siblings();
        let pos = siblings.iter().position(|&s| s == self.id)?;
        siblings[pos + 1..]
            .iter()
            .find_map(|&s| ElementRef::new(self.doc, s))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.doc
            .children(self.id)
            .iter()
            .find_map(|&c| ElementRef::new(self.doc, c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.element.tag.eq_ignore_ascii_case(local_name)
    }

    fn has_namespace(&self, ns: &str) -> bool {
        ns.is_empty() || ns == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.element.tag == other.element.tag
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&CssString>,
        local_name: &CssString,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if let NamespaceConstraint::Specific(url) = ns {
            if !self.has_namespace(url.0.as_str()) {
                return false;
            }
        }
        let Some(actual) = self.attr_value(local_name.0.as_str()) else {
            return false;
        };
        match operation {
            AttrSelectorOperation::Exists => true,
            AttrSelectorOperation::WithValue {
                operator,
                case_sensitivity,
                value,
            } => operator.eval_str(&actual, value.0.as_str(), *case_sensitivity),
        }
    }

    fn match_non_ts_pseudo_class(
        &self,
        pseudo: &PseudoClass,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match pseudo {
            PseudoClass::Link | PseudoClass::AnyLink => self.is_link(),
            PseudoClass::Checked => {
                self.element.tag == "input" && self.element.attr("checked").is_some()
            }
            PseudoClass::Disabled => {
                self.is_form_control() && self.element.attr("disabled").is_some()
            }
            PseudoClass::Enabled => {
                self.is_form_control() && self.element.attr("disabled").is_none()
            }
            PseudoClass::Hover
            | PseudoClass::Active
            | PseudoClass::Focus
            | PseudoClass::FocusVisible
            | PseudoClass::FocusWithin
            | PseudoClass::Target
            | PseudoClass::Visited
            | PseudoClass::Vendor(_) => false,
        }
    }

    fn match_pseudo_element(
        &self,
        _pseudo: &PseudoElement,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.element.tag.as_str(), "a" | "area" | "link")
            && self.element.attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.element
            .id()
            .is_some_and(|actual| same_name(actual, &id.0, case_sensitivity))
    }

    fn has_class(&self, class: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.element
            .classes
            .iter()
            .any(|c| same_name(c, &class.0, case_sensitivity))
    }

    fn has_custom_state(&self, _name: &CssString) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssString) -> Option<CssString> {
        None
    }

    fn is_part(&self, _name: &CssString) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.doc
            .children(self.id)
            .iter()
            .all(|&c| match &self.doc.node(c).kind {
                NodeKind::Text(text) => text.is_empty(),
                NodeKind::Element(_) => false,
            })
    }

    fn is_root(&self) -> bool {
        self.doc.parent(self.id).is_none()
    }

    fn add_element_unique_hashes(
        &self,
        _filter: &mut selectors::bloom::CountingBloomFilter<selectors::bloom::BloomStorageU8>,
    ) -> bool {
        false
    }
}

fn same_name(actual: &str, expected: &str, case_sensitivity: CaseSensitivity) -> bool {
    match case_sensitivity {
        CaseSensitivity::CaseSensitive => actual == expected,
        CaseSensitivity::AsciiCaseInsensitive => actual.eq_ignore_ascii_case(expected),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Matching
// ─────────────────────────────────────────────────────────────────────────────

/// Matches selector lists against elements, reusing the engine's caches
/// across one cascade pass.
#[derive(Default)]
pub struct SelectorMatcher {
    caches: SelectorCaches,
}

impl SelectorMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest specificity among the selectors of `list` that match `node`.
    /// Selectors ending in a pseudo-element never match an element.
    pub fn matching_specificity(&mut self, list: &Selectors, doc: &Document, node: NodeId) -> Option<u32> {
        let element = ElementRef::new(doc, node)?;
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut self.caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        let mut best = None;
        for selector in list.slice().iter() {
            if selector.pseudo_element().is_some() {
                continue;
            }
            if matches_selector(selector, 0, None, &element, &mut context) {
                best = best.max(Some(selector.specificity()));
            }
        }
        best
    }

    pub fn matches(&mut self, list: &Selectors, doc: &Document, node: NodeId) -> bool {
        self.matching_specificity(list, doc, node).is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        doc.element_mut(root)
            .unwrap()
            .set_attr("class", "markdown-content debug-margins md:flex");
        doc.element_mut(root).unwrap().set_attr("id", "preview-content");
        let ul = doc.append_element(root, "ul");
        let first = doc.append_element(ul, "li");
        doc.element_mut(first).unwrap().set_attr("data-kind", "task");
        let second = doc.append_element(ul, "li");
        doc.append_text(second, "done");
        (doc, root, ul, first, second)
    }

    fn matches(selector: &str, doc: &Document, node: NodeId) -> bool {
        let list = parse_selector(selector).unwrap_or_else(|| panic!("{} should parse", selector));
        SelectorMatcher::new().matches(&list, doc, node)
    }

    #[test]
    fn test_combinators_and_attributes() {
        let (doc, root, ul, first, second) = sample();
        assert!(matches(".markdown-content li", &doc, first));
        assert!(matches("ul > li", &doc, first));
        assert!(!matches(".markdown-content > li", &doc, first));
        assert!(matches(".debug-margins *", &doc, ul));
        assert!(matches("li[data-kind=\"task\"]", &doc, first));
        assert!(!matches("li[data-kind=note]", &doc, first));
        assert!(matches("li + li", &doc, second));
        assert!(matches("li ~ li", &doc, second));
        assert!(!matches("li + li", &doc, first));
        assert!(matches("#preview-content", &doc, root));
        assert!(matches("[class~=debug-margins]", &doc, root));
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let (doc, root, _, first, second) = sample();
        assert!(matches(":root", &doc, doc.body()));
        assert!(!matches(":root", &doc, root));
        assert!(matches("li:first-child", &doc, first));
        assert!(matches("li:last-child", &doc, second));
        assert!(matches("li:nth-child(2)", &doc, second));
        assert!(matches("li:empty", &doc, first));
        assert!(!matches("li:empty", &doc, second));
        assert!(matches(":is(ul, ol) > li", &doc, first));
    }

    #[test]
    fn test_escaped_class_name() {
        let (doc, root, ..) = sample();
        assert!(matches(".md\\:flex", &doc, root));
    }

    #[test]
    fn test_interaction_states_never_match() {
        let (doc, root, ..) = sample();
        assert!(!matches("div:hover", &doc, root));
        assert!(!matches("div:-webkit-any-link", &doc, root));
        assert!(parse_selector("a:hover, a").is_some());
    }

    #[test]
    fn test_pseudo_element_selectors_skip_elements() {
        let (doc, root, ..) = sample();
        let list = parse_selector("div::before").unwrap();
        assert!(!SelectorMatcher::new().matches(&list, &doc, root));
        assert!(parse_selector("div::-webkit-scrollbar").is_some());
    }

    #[test]
    fn test_invalid_selectors_rejected() {
        assert!(parse_selector("svg|rect").is_none());
        assert!(parse_selector("p:unknown-state").is_none());
        assert!(parse_selector("p::unknown").is_none());
        assert!(parse_selector("").is_none());
        assert!(parse_selector("p !").is_none());
    }

    #[test]
    fn test_specificity_ordering() {
        let (doc, _, _, first, _) = sample();
        let mut matcher = SelectorMatcher::new();
        let id = parse_selector("#preview-content li").unwrap();
        let class = parse_selector(".markdown-content li").unwrap();
        let tag = parse_selector("ul li").unwrap();
        let id = matcher.matching_specificity(&id, &doc, first).unwrap();
        let class = matcher.matching_specificity(&class, &doc, first).unwrap();
        let tag = matcher.matching_specificity(&tag, &doc, first).unwrap();
        assert!(id > class && class > tag);
    }

    #[test]
    fn test_text_nodes_do_not_match() {
        let (doc, _, _, _, second) = sample();
        let text = doc.children(second)[0];
        let list = parse_selector("*").unwrap();
        assert_eq!(SelectorMatcher::new().matching_specificity(&list, &doc, text), None);
    }
}
