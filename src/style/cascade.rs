//! Computed style cascade
//!
//! `compute_styles` walks a document and produces a flat map from every
//! element to its resolved property values: cascade by importance, origin,
//! specificity and source order; inline styles; inheritance of text
//! properties; `inherit`; custom properties with `var()` fallbacks; and
//! `font-size` in absolute pixels.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::css::{parse_declarations, parse_stylesheet, value_components, Declaration, Rule};
use super::selector::SelectorMatcher;
use crate::dom::{Document, NodeId};

/// Minimal user-agent defaults for the tags the preview renderer emits.
const USER_AGENT_CSS: &str = r#"
body { display: block; font-size: 16px; font-family: sans-serif; line-height: 1.2; color: #000000; }
div, p, h1, h2, h3, h4, h5, h6, ul, ol, li, pre, blockquote, hr, table, section, header, footer, article, nav { display: block; }
thead, tbody, tr { display: block; }
td, th { display: block; }
tr { display: table-row; }
td, th { display: table-cell; padding: 1px; }
th { font-weight: bold; }
p, ul, ol, blockquote, pre, table { margin-top: 1em; margin-bottom: 1em; }
h1 { font-size: 2em; font-weight: bold; margin-top: 0.67em; margin-bottom: 0.67em; }
h2 { font-size: 1.5em; font-weight: bold; margin-top: 0.83em; margin-bottom: 0.83em; }
h3 { font-size: 1.17em; font-weight: bold; margin-top: 1em; margin-bottom: 1em; }
h4 { font-weight: bold; margin-top: 1.33em; margin-bottom: 1.33em; }
h5 { font-size: 0.83em; font-weight: bold; }
h6 { font-size: 0.67em; font-weight: bold; }
ul, ol { padding-left: 40px; }
li { display: list-item; }
strong, b { font-weight: bold; }
em, i { font-style: italic; }
code, pre, kbd { font-family: monospace; }
pre { white-space: pre; }
a { text-decoration: underline; }
del, s { text-decoration: line-through; }
hr { border-top: 1px solid #808080; margin-top: 0.5em; margin-bottom: 0.5em; }
blockquote { margin-left: 40px; margin-right: 40px; }
img { display: inline-block; }
br { display: inline; }
"#;

/// Properties that inherit from the parent element by default.
const INHERITED: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "line-height",
    "text-align",
    "text-rendering",
    "-webkit-font-smoothing",
    "white-space",
    "list-style-type",
    "visibility",
];

const DEFAULT_FONT_SIZE: f32 = 16.0;
const MAX_VAR_DEPTH: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Computed Style
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved property values of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    props: BTreeMap<String, String>,
}

impl ComputedStyle {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(|s| s.as_str())
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.props.insert(name.to_string(), value.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `display`, defaulting to `inline` like an unknown element.
    pub fn display(&self) -> &str {
        self.get_or("display", "inline")
    }

    /// Computed font size in pixels.
    pub fn font_size(&self) -> f32 {
        self.get("font-size")
            .and_then(|v| v.strip_suffix("px"))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Line height in pixels. Unitless values multiply the font size.
    pub fn line_height(&self) -> f32 {
        let size = self.font_size();
        match self.get("line-height") {
            Some("normal") | None => size * 1.2,
            Some(value) => match parse_length(value, size) {
                Some(Length::Px(px)) => px,
                Some(Length::Percent(pct)) => size * pct / 100.0,
                _ => value.parse::<f32>().map(|m| size * m).unwrap_or(size * 1.2),
            },
        }
    }

    /// A length property in pixels; percentages resolve against `base`,
    /// `auto` and missing values yield `None`.
    pub fn length(&self, name: &str, base: f32) -> Option<f32> {
        match parse_length(self.get(name)?, self.font_size())? {
            Length::Px(px) => Some(px),
            Length::Percent(pct) => Some(base * pct / 100.0),
            Length::Auto => None,
        }
    }

    /// `[top, right, bottom, left]` for `margin`/`padding`.
    pub fn edges(&self, property: &str, base: f32) -> [f32; 4] {
        SIDES.map(|side| {
            self.length(&format!("{}-{}", property, side), base)
                .unwrap_or(0.0)
        })
    }

    /// Border width per side, zero when the side's style is `none`.
    pub fn border_widths(&self) -> [f32; 4] {
        SIDES.map(|side| {
            match self.get(&format!("border-{}-style", side)) {
                None | Some("none") | Some("hidden") => 0.0,
                Some(_) => self
                    .length(&format!("border-{}-width", side), 0.0)
                    .unwrap_or(3.0),
            }
        })
    }

    pub fn is_bold(&self) -> bool {
        match self.get("font-weight") {
            Some("bold") | Some("bolder") => true,
            Some(w) => w.parse::<u32>().is_ok_and(|w| w >= 600),
            None => false,
        }
    }

    /// Family names from `font-family`, normalized.
    pub fn font_families(&self) -> Vec<String> {
        self.get("font-family")
            .map(super::css::font_family_list)
            .unwrap_or_default()
    }
}

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// A parsed CSS length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    Percent(f32),
    Auto,
}

/// Parse a length with `em`/`rem` resolved against `font_size`.
pub fn parse_length(value: &str, font_size: f32) -> Option<Length> {
    let value = value.trim();
    if value == "auto" {
        return Some(Length::Auto);
    }
    if value == "0" {
        return Some(Length::Px(0.0));
    }
    let num = |s: &str| s.trim().parse::<f32>().ok();
    if let Some(v) = value.strip_suffix("rem") {
        return num(v).map(|v| Length::Px(v * DEFAULT_FONT_SIZE));
    }
    if let Some(v) = value.strip_suffix("em") {
        return num(v).map(|v| Length::Px(v * font_size));
    }
    if let Some(v) = value.strip_suffix("px") {
        return num(v).map(Length::Px);
    }
    if let Some(v) = value.strip_suffix("pt") {
        return num(v).map(|v| Length::Px(v * 4.0 / 3.0));
    }
    if let Some(v) = value.strip_suffix('%') {
        return num(v).map(Length::Percent);
    }
    None
}

/// Format pixels the way computed values are stored (`16px`, `12.5px`).
pub fn format_px(px: f32) -> String {
    let rounded = (px * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}px", rounded as i64)
    } else {
        format!("{}px", rounded)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Style Map
// ─────────────────────────────────────────────────────────────────────────────

/// Computed styles for every element of a document.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    styles: HashMap<NodeId, ComputedStyle>,
    font_faces: Vec<String>,
}

impl StyleMap {
    pub fn get(&self, id: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Families declared by `@font-face` in the document's stylesheets.
    pub fn font_faces(&self) -> &[String] {
        &self.font_faces
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cascade
// ─────────────────────────────────────────────────────────────────────────────

/// Ordering key of a matched declaration, lowest applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CascadeKey {
    important: bool,
    author: bool,
    inline: bool,
    specificity: u32,
    order: (usize, usize),
}

struct Origin {
    author: bool,
    rules: Vec<Rule>,
}

/// Compute styles for every element in `doc` from its attached stylesheets.
pub fn compute_styles(doc: &Document) -> StyleMap {
    let user_agent = parse_stylesheet(USER_AGENT_CSS);
    let mut origins = vec![Origin {
        author: false,
        rules: user_agent.rules,
    }];
    let mut font_faces = Vec::new();
    for sheet in doc.stylesheets() {
        let parsed = parse_stylesheet(sheet.css());
        font_faces.extend(parsed.font_faces);
        origins.push(Origin {
            author: true,
            rules: parsed.rules,
        });
    }

    let mut map = StyleMap {
        styles: HashMap::new(),
        font_faces,
    };

    let mut matcher = SelectorMatcher::new();
    let body = doc.body();
    let mut stack = vec![body];
    while let Some(id) = stack.pop() {
        if doc.element(id).is_none() {
            continue;
        }
        let parent = doc.parent(id).and_then(|p| map.styles.get(&p));
        let root_size = map
            .styles
            .get(&body)
            .map(ComputedStyle::font_size)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let style = compute_element(doc, id, &origins, &mut matcher, parent, root_size);
        map.styles.insert(id, style);
        stack.extend(doc.children(id).iter().rev());
    }

    debug!("Computed styles for {} elements", map.styles.len());
    map
}

fn compute_element(
    doc: &Document,
    id: NodeId,
    origins: &[Origin],
    matcher: &mut SelectorMatcher,
    parent: Option<&ComputedStyle>,
    root_size: f32,
) -> ComputedStyle {
    let mut matched: Vec<(CascadeKey, &Declaration)> = Vec::new();
    let mut order = 0usize;
    for origin in origins {
        for rule in &origin.rules {
            order += 1;
            let Some(specificity) = matcher.matching_specificity(&rule.selectors, doc, id) else {
                continue;
            };
            for (i, decl) in rule.declarations.iter().enumerate() {
                let key = CascadeKey {
                    important: decl.important,
                    author: origin.author,
                    inline: false,
                    specificity,
                    order: (order, i),
                };
                matched.push((key, decl));
            }
        }
    }

    let inline: Vec<Declaration> = doc
        .element(id)
        .map(|el| parse_declarations(&el.style.to_css_text()))
        .unwrap_or_default();
    for (i, decl) in inline.iter().enumerate() {
        let key = CascadeKey {
            important: decl.important,
            author: true,
            inline: true,
            specificity: 0,
            order: (usize::MAX, i),
        };
        matched.push((key, decl));
    }
    matched.sort_by(|a, b| a.0.cmp(&b.0));

    // Specified values, with shorthands expanded in cascade order
    let mut specified: BTreeMap<String, String> = BTreeMap::new();
    for (_, decl) in &matched {
        apply_declaration(&mut specified, &decl.name, &decl.value);
    }

    let mut style = ComputedStyle::default();
    if let Some(parent) = parent {
        for (name, value) in parent.iter() {
            if name.starts_with("--") || INHERITED.contains(&name) {
                style.set(name, value);
            }
        }
    }

    // Custom properties first so `var()` in regular properties can see them
    let (custom, regular): (Vec<_>, Vec<_>) =
        specified.into_iter().partition(|(n, _)| n.starts_with("--"));
    for (name, value) in custom {
        if value == "inherit" {
            continue;
        }
        style.set(&name, &value);
    }
    let custom_snapshot = style.clone();
    for (name, value) in style.props.iter_mut() {
        if name.starts_with("--") {
            if let Some(resolved) = substitute_vars(value, &custom_snapshot, 0) {
                *value = resolved;
            }
        }
    }

    let parent_size = parent.map(ComputedStyle::font_size).unwrap_or(DEFAULT_FONT_SIZE);
    for (name, value) in regular {
        let Some(value) = substitute_vars(&value, &style, 0) else {
            debug!("Dropping '{}' with unresolvable var()", name);
            continue;
        };
        match value.as_str() {
            "inherit" => {
                match parent.and_then(|p| p.get(&name)) {
                    Some(v) => style.set(&name, v),
                    None => {
                        style.props.remove(&name);
                    }
                }
            }
            "initial" | "unset" => {
                style.props.remove(&name);
            }
            _ if name == "font-size" => {
                let px = resolve_font_size(&value, parent_size, root_size);
                style.set("font-size", &format_px(px));
            }
            _ => style.set(&name, &value),
        }
    }

    // currentColor resolves against this element's color
    let color = style.get_or("color", "#000000").to_string();
    for (name, value) in style.props.iter_mut() {
        if !name.starts_with("--") && value.eq_ignore_ascii_case("currentcolor") {
            *value = color.clone();
        }
    }

    style
}

fn resolve_font_size(value: &str, parent: f32, root: f32) -> f32 {
    match value.trim() {
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        "smaller" => parent / 1.2,
        "larger" => parent * 1.2,
        v => {
            if let Some(rem) = v.strip_suffix("rem") {
                return rem.trim().parse::<f32>().map(|r| r * root).unwrap_or(parent);
            }
            match parse_length(v, parent) {
                Some(Length::Px(px)) => px,
                Some(Length::Percent(pct)) => parent * pct / 100.0,
                _ => parent,
            }
        }
    }
}

/// Record a declaration, expanding the shorthands layout and paint read.
fn apply_declaration(specified: &mut BTreeMap<String, String>, name: &str, value: &str) {
    let mut set = |n: &str, v: &str| {
        specified.insert(n.to_string(), v.to_string());
    };

    match name {
        "margin" | "padding" => {
            let parts: Vec<&str> = value.split_whitespace().collect();
            let [t, r, b, l] = match parts.as_slice() {
                [a] => [*a, *a, *a, *a],
                [a, b] => [*a, *b, *a, *b],
                [a, b, c] => [*a, *b, *c, *b],
                [a, b, c, d, ..] => [*a, *b, *c, *d],
                [] => return,
            };
            set(name, value);
            for (side, v) in SIDES.iter().zip([t, r, b, l]) {
                set(&format!("{}-{}", name, side), v);
            }
        }
        "border" => {
            set(name, value);
            for side in SIDES {
                expand_border_side(&mut set, side, value);
            }
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            set(name, value);
            expand_border_side(&mut set, &name["border-".len()..], value);
        }
        "border-color" | "border-style" | "border-width" => {
            set(name, value);
            let suffix = &name["border-".len()..];
            for side in SIDES {
                set(&format!("border-{}-{}", side, suffix), value);
            }
        }
        "background" => {
            set(name, value);
            let color = value
                .split_whitespace()
                .find(|t| super::color::parse_color(t).is_some())
                .or_else(|| super::color::parse_color(value).map(|_| value));
            if let Some(color) = color {
                set("background-color", color);
            } else if value.trim() == "none" {
                set("background-color", "transparent");
            }
        }
        "font" => {
            // Only the common "<size>[/<line-height>] <family>" tail is honored
            set(name, value);
            let mut tokens = value.splitn(2, |c: char| c.is_whitespace());
            if let (Some(size), Some(family)) = (tokens.next(), tokens.next()) {
                let (size, line) = size.split_once('/').unwrap_or((size, ""));
                if parse_length(size, DEFAULT_FONT_SIZE).is_some() {
                    set("font-size", size);
                    set("font-family", family.trim());
                    if !line.is_empty() {
                        set("line-height", line);
                    }
                }
            }
        }
        "text-decoration" => {
            set(name, value);
            for token in value.split_whitespace() {
                match token {
                    "underline" | "line-through" | "overline" | "none" => {
                        set("text-decoration-line", token)
                    }
                    t if super::color::parse_color(t).is_some() => {
                        set("text-decoration-color", t)
                    }
                    _ => {}
                }
            }
        }
        _ => set(name, value),
    }
}

fn expand_border_side(set: &mut impl FnMut(&str, &str), side: &str, value: &str) {
    if value.trim() == "none" || value.trim() == "0" {
        set(&format!("border-{}-style", side), "none");
        return;
    }
    for token in value_components(value) {
        let token = token.as_str();
        let slot = if parse_length(token, DEFAULT_FONT_SIZE).is_some()
            || matches!(token, "thin" | "medium" | "thick")
        {
            "width"
        } else if matches!(
            token,
            "solid" | "dashed" | "dotted" | "double" | "none" | "hidden" | "groove" | "ridge" | "inset" | "outset"
        ) {
            "style"
        } else {
            "color"
        };
        set(&format!("border-{}-{}", side, slot), token);
    }
}

/// Replace every `var(--name[, fallback])` in `value`. `None` when a
/// reference has neither a value nor a fallback.
fn substitute_vars(value: &str, style: &ComputedStyle, depth: usize) -> Option<String> {
    if depth > MAX_VAR_DEPTH {
        return None;
    }
    let Some(start) = value.find("var(") else {
        return Some(value.to_string());
    };

    let inner_start = start + 4;
    let mut depth_paren = 1i32;
    let mut end = None;
    for (i, c) in value[inner_start..].char_indices() {
        match c {
            '(' => depth_paren += 1,
            ')' => {
                depth_paren -= 1;
                if depth_paren == 0 {
                    end = Some(inner_start + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;

    let inner = &value[inner_start..end];
    let (name, fallback) = match inner.split_once(',') {
        Some((n, f)) => (n.trim(), Some(f.trim())),
        None => (inner.trim(), None),
    };
    let replacement = match style.get(name) {
        Some(v) => substitute_vars(v, style, depth + 1)?,
        None => substitute_vars(fallback?, style, depth + 1)?,
    };

    let rest = substitute_vars(&value[end + 1..], style, depth + 1)?;
    Some(format!("{}{}{}", &value[..start], replacement, rest))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::StyleSheet;

    fn doc_with(css: &str) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        doc.element_mut(root).unwrap().set_attr("class", "markdown-content");
        doc.element_mut(root).unwrap().set_attr("id", "preview-content");
        let p = doc.append_element(root, "p");
        doc.append_text(p, "hello");
        doc.add_stylesheet(StyleSheet::inline(css));
        (doc, root, p)
    }

    #[test]
    fn test_specificity_and_order() {
        let (doc, _, p) = doc_with(
            "#preview-content p { color: red; } p { color: blue; } .markdown-content p { color: green; }",
        );
        let styles = compute_styles(&doc);
        assert_eq!(styles.get(p).unwrap().get("color"), Some("red"));
    }

    #[test]
    fn test_important_and_inline() {
        let (mut doc, _, p) = doc_with("p { color: blue !important; margin: 4px; }");
        doc.element_mut(p).unwrap().set_attr("style", "color: red; margin: 8px");
        let styles = compute_styles(&doc);
        let style = styles.get(p).unwrap();
        assert_eq!(style.get("color"), Some("blue"));
        assert_eq!(style.get("margin-top"), Some("8px"));
    }

    #[test]
    fn test_inheritance_and_inherit_keyword() {
        let (doc, _, p) = doc_with(
            ".markdown-content { color: #333333; font-size: 20px; background-color: #fff; } p { background-color: inherit; }",
        );
        let styles = compute_styles(&doc);
        let style = styles.get(p).unwrap();
        assert_eq!(style.get("color"), Some("#333333"));
        assert_eq!(style.font_size(), 20.0);
        assert_eq!(style.get("background-color"), Some("#fff"));
    }

    #[test]
    fn test_custom_properties_and_fallback() {
        let (doc, _, p) = doc_with(
            ":root { --unused: 1; } .markdown-content { --fg: #123456; } p { color: var(--fg); border-color: var(--missing, #abcdef); }",
        );
        let styles = compute_styles(&doc);
        let style = styles.get(p).unwrap();
        assert_eq!(style.get("color"), Some("#123456"));
        assert_eq!(style.get("border-top-color"), Some("#abcdef"));
    }

    #[test]
    fn test_font_size_units() {
        let (doc, root, p) = doc_with(".markdown-content { font-size: 1.25rem; } p { font-size: 150%; }");
        let styles = compute_styles(&doc);
        assert_eq!(styles.get(root).unwrap().get("font-size"), Some("20px"));
        assert_eq!(styles.get(p).unwrap().get("font-size"), Some("30px"));
    }

    #[test]
    fn test_shorthand_expansion() {
        let (doc, root, _) = doc_with(
            ".markdown-content { padding: 2rem 1rem; border-left: 4px solid #ff0000; background: #eeeeee; }",
        );
        let styles = compute_styles(&doc);
        let style = styles.get(root).unwrap();
        assert_eq!(style.edges("padding", 0.0), [32.0, 16.0, 32.0, 16.0]);
        assert_eq!(style.border_widths(), [0.0, 0.0, 0.0, 4.0]);
        assert_eq!(style.get("border-left-color"), Some("#ff0000"));
        assert_eq!(style.get("background-color"), Some("#eeeeee"));
    }

    #[test]
    fn test_user_agent_defaults() {
        let (doc, root, p) = doc_with("");
        let styles = compute_styles(&doc);
        assert_eq!(styles.get(root).unwrap().display(), "block");
        assert_eq!(styles.get(p).unwrap().length("margin-top", 0.0), Some(16.0));
    }

    #[test]
    fn test_font_faces_collected() {
        let (doc, _, _) = doc_with("@font-face { font-family: 'Inter'; src: url(x.woff2); }");
        assert_eq!(compute_styles(&doc).font_faces(), ["inter".to_string()]);
    }

    #[test]
    fn test_real_world_sheets_style_following_rules() {
        let cases = [
            ".md\\:flex { display: flex; } .markdown-content p { color: red; }",
            ".a { content: \"}\"; } .markdown-content p { color: red; }",
            "p::before { content: \"{;}\"; color: blue; } p { color: red; }",
            "@media (max-width: 600px) { p { color: blue; } } p { color: red; }",
            "@namespace svg url(http://www.w3.org/2000/svg); svg|rect { fill: blue; } p { color: red; }",
            "p:hover { color: blue; } .markdown-content > p:first-child { color: red; }",
            "p { color: red; } p { color: blue; } p:not(.markdown-content) { color: red; }",
        ];
        for css in cases {
            let (doc, _, p) = doc_with(css);
            let styles = compute_styles(&doc);
            assert_eq!(styles.get(p).unwrap().get("color"), Some("red"), "{}", css);
        }
    }

    #[test]
    fn test_escaped_class_selector_applies() {
        let (mut doc, root, _) = doc_with(".md\\:flex { display: flex; }");
        doc.element_mut(root).unwrap().set_attr("class", "markdown-content md:flex");
        let styles = compute_styles(&doc);
        assert_eq!(styles.get(root).unwrap().display(), "flex");
    }

    #[test]
    fn test_line_height() {
        let (doc, _, p) = doc_with("p { font-size: 10px; line-height: 1.5; }");
        let styles = compute_styles(&doc);
        assert_eq!(styles.get(p).unwrap().line_height(), 15.0);
    }
}
