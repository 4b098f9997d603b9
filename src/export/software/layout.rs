//! Block and inline flow layout for the software host
//!
//! Produces a flat, paint-ordered list of fragments: element boxes, runs of
//! text, replaced images and task-list checkboxes. Supports normal block
//! flow with sibling margin collapsing, `width`/`max-width`/auto margins,
//! `box-sizing`, greedy word wrapping, `white-space: pre`, `text-align`,
//! list markers and equal-width table cells.

use crate::dom::{Document, NodeId, NodeKind};
use crate::export::host::HostLayout;
use crate::style::{ComputedStyle, StyleMap};

use super::assets::AssetStore;

/// Glyph cell size relative to the font size. Glyphs are square 8x8 cells.
pub const GLYPH_RATIO: f32 = 0.55;

const BROKEN_IMAGE_SIZE: f32 = 48.0;

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fragments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentKind {
    /// Border box of a block-level element
    Box,
    /// A run of text styled by `Fragment::node`
    Text(String),
    /// A replaced `<img>`
    Image(String),
    /// A task-list `<input type="checkbox">`
    Checkbox { checked: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Element whose computed style paints this fragment
    pub node: NodeId,
    pub rect: Rect,
    pub kind: FragmentKind,
}

/// Laid-out tree: the root's border box and every fragment in paint order.
#[derive(Debug, Clone, Default)]
pub struct SoftwareLayout {
    pub root: Rect,
    pub fragments: Vec<Fragment>,
}

impl HostLayout for SoftwareLayout {
    fn width(&self) -> f32 {
        self.root.width
    }

    fn height(&self) -> f32 {
        self.root.height
    }
}

/// Horizontal advance of one glyph at `font_size`.
pub fn advance(font_size: f32) -> f32 {
    font_size * GLYPH_RATIO
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout Entry Point
// ─────────────────────────────────────────────────────────────────────────────

/// Lay out `root` in a container `width` CSS pixels wide.
pub fn layout_tree(
    doc: &Document,
    styles: &StyleMap,
    assets: &AssetStore,
    root: NodeId,
    width: f32,
) -> SoftwareLayout {
    let mut cx = LayoutContext {
        doc,
        styles,
        assets,
        fallback: ComputedStyle::default(),
        fragments: Vec::new(),
    };
    if cx.display(root) == "none" {
        return SoftwareLayout::default();
    }
    let margin_top = cx.style(root).edges("margin", width)[0];
    let (_, rect) = cx.layout_block(root, 0.0, margin_top, width.max(0.0));
    SoftwareLayout {
        root: rect,
        fragments: cx.fragments,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout Context
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of inline content.
#[derive(Debug, Clone)]
enum Atom {
    Word { node: NodeId, text: String, width: f32 },
    Space { node: NodeId, width: f32 },
    Break,
    Image { node: NodeId, src: String, width: f32, height: f32 },
    Checkbox { node: NodeId, size: f32, checked: bool },
}

impl Atom {
    fn width(&self) -> f32 {
        match self {
            Atom::Word { width, .. } | Atom::Space { width, .. } | Atom::Image { width, .. } => {
                *width
            }
            Atom::Checkbox { size, .. } => *size,
            Atom::Break => 0.0,
        }
    }

    fn node(&self) -> Option<NodeId> {
        match self {
            Atom::Word { node, .. }
            | Atom::Space { node, .. }
            | Atom::Image { node, .. }
            | Atom::Checkbox { node, .. } => Some(*node),
            Atom::Break => None,
        }
    }
}

struct LayoutContext<'a> {
    doc: &'a Document,
    styles: &'a StyleMap,
    assets: &'a AssetStore,
    fallback: ComputedStyle,
    fragments: Vec<Fragment>,
}

impl LayoutContext<'_> {
    fn style(&self, node: NodeId) -> &ComputedStyle {
        self.styles.get(node).unwrap_or(&self.fallback)
    }

    fn display(&self, node: NodeId) -> &str {
        match self.doc.node(node).kind {
            NodeKind::Text(_) => "inline",
            NodeKind::Element(_) => self.style(node).display(),
        }
    }

    fn is_block(&self, node: NodeId) -> bool {
        matches!(
            self.display(node),
            "block" | "list-item" | "table" | "table-row" | "table-cell" | "flex" | "grid"
        )
    }

    fn tag(&self, node: NodeId) -> &str {
        self.doc.element(node).map(|el| el.tag.as_str()).unwrap_or("")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Block Flow
    // ─────────────────────────────────────────────────────────────────────────

    /// Lay out a block whose border box top sits at `y` inside a container
    /// starting at `x` and `container_width` wide. Returns the fragment
    /// index and border box.
    fn layout_block(&mut self, node: NodeId, x: f32, y: f32, container_width: f32) -> (usize, Rect) {
        let style = self.style(node).clone();
        let margin = style.edges("margin", container_width);
        let padding = style.edges("padding", container_width);
        let border = style.border_widths();
        let extra_h = padding[1] + padding[3] + border[1] + border[3];
        let extra_v = padding[0] + padding[2] + border[0] + border[2];
        let border_box = style.get("box-sizing") == Some("border-box");

        let to_border_box = |w: f32| if border_box { w } else { w + extra_h };
        let mut width = match style.length("width", container_width) {
            Some(w) => to_border_box(w),
            None => container_width - margin[1] - margin[3],
        };
        if let Some(max) = style.length("max-width", container_width) {
            width = width.min(to_border_box(max));
        }
        width = width.max(extra_h);

        let auto_left = style.get("margin-left") == Some("auto");
        let auto_right = style.get("margin-right") == Some("auto");
        let left = match (auto_left, auto_right) {
            (true, true) => x + ((container_width - width) / 2.0).max(0.0),
            (true, false) => x + (container_width - width - margin[1]).max(0.0),
            _ => x + margin[3],
        };

        let index = self.fragments.len();
        self.fragments.push(Fragment {
            node,
            rect: Rect::new(left, y, width, 0.0),
            kind: FragmentKind::Box,
        });

        let content_x = left + border[3] + padding[3];
        let content_y = y + border[0] + padding[0];
        let content_w = (width - extra_h).max(0.0);

        if style.display() == "list-item" {
            self.push_list_marker(node, &style, content_x, content_y);
        }

        let content_h = if style.display() == "table-row" {
            self.layout_row(node, content_x, content_y, content_w)
        } else {
            self.layout_children(node, content_x, content_y, content_w)
        };

        let mut height = content_h + extra_v;
        if let Some(h) = style.length("height", 0.0) {
            height = if border_box { h } else { h + extra_v };
        }
        self.fragments[index].rect.height = height;
        (index, self.fragments[index].rect)
    }

    /// Lay out children of a block container; returns the content height.
    fn layout_children(&mut self, node: NodeId, x: f32, y: f32, width: f32) -> f32 {
        let children: Vec<NodeId> = self
            .doc
            .children(node)
            .iter()
            .copied()
            .filter(|c| self.display(*c) != "none")
            .collect();

        if !children.iter().any(|c| self.is_block(*c)) {
            return self.layout_inline(node, &children, x, y, width);
        }

        let mut cursor = y;
        let mut pending_margin = 0.0f32;
        let mut run: Vec<NodeId> = Vec::new();

        for child in children {
            if !self.is_block(child) {
                run.push(child);
                continue;
            }
            if self.has_visible_content(&run) {
                cursor += pending_margin;
                pending_margin = 0.0;
                cursor += self.layout_inline(node, &run, x, cursor, width);
            }
            run.clear();

            let margin = self.style(child).edges("margin", width);
            let top = cursor + pending_margin.max(margin[0]);
            let (_, rect) = self.layout_block(child, x, top, width);
            cursor = rect.bottom();
            pending_margin = margin[2];
        }
        if self.has_visible_content(&run) {
            cursor += pending_margin;
            pending_margin = 0.0;
            cursor += self.layout_inline(node, &run, x, cursor, width);
        }

        cursor + pending_margin - y
    }

    fn has_visible_content(&self, nodes: &[NodeId]) -> bool {
        nodes.iter().any(|n| match &self.doc.node(*n).kind {
            NodeKind::Text(t) => !t.trim().is_empty(),
            NodeKind::Element(_) => true,
        })
    }

    /// Cells of a table row side by side with equal widths.
    fn layout_row(&mut self, row: NodeId, x: f32, y: f32, width: f32) -> f32 {
        let cells: Vec<NodeId> = self
            .doc
            .children(row)
            .iter()
            .copied()
            .filter(|c| self.doc.element(*c).is_some() && self.display(*c) != "none")
            .collect();
        if cells.is_empty() {
            return 0.0;
        }

        let cell_width = width / cells.len() as f32;
        let mut placed = Vec::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            placed.push(self.layout_block(*cell, x + i as f32 * cell_width, y, cell_width));
        }
        let row_height = placed
            .iter()
            .map(|(_, r)| r.height)
            .fold(0.0f32, f32::max);
        for (index, _) in placed {
            self.fragments[index].rect.height = row_height;
        }
        row_height
    }

    fn push_list_marker(&mut self, item: NodeId, style: &ComputedStyle, content_x: f32, content_y: f32) {
        let list_style = style.get_or("list-style-type", "disc");
        if list_style == "none" {
            return;
        }
        let marker = match self.doc.parent(item) {
            Some(parent) if self.tag(parent) == "ol" || list_style == "decimal" => {
                let start = self
                    .doc
                    .element(parent)
                    .and_then(|el| el.attr("start"))
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(1);
                let position = self
                    .doc
                    .children(parent)
                    .iter()
                    .filter(|c| self.tag(**c) == "li")
                    .position(|c| *c == item)
                    .unwrap_or(0);
                format!("{}.", start + position)
            }
            _ => "-".to_string(),
        };

        let adv = advance(style.font_size());
        let marker_width = marker.chars().count() as f32 * adv;
        self.fragments.push(Fragment {
            node: item,
            rect: Rect::new(
                content_x - marker_width - adv,
                content_y,
                marker_width,
                style.line_height(),
            ),
            kind: FragmentKind::Text(marker),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline Flow
    // ─────────────────────────────────────────────────────────────────────────

    /// Lay out inline content of `container`; returns the total line height.
    fn layout_inline(&mut self, container: NodeId, nodes: &[NodeId], x: f32, y: f32, width: f32) -> f32 {
        let mut atoms = Vec::new();
        for node in nodes {
            self.collect_atoms(*node, container, width, &mut atoms);
        }
        if atoms.is_empty() {
            return 0.0;
        }

        let container_style = self.style(container).clone();
        let strut = container_style.line_height();
        let lines = break_lines(atoms, width);

        let align = container_style.get_or("text-align", "left").to_string();
        let mut cursor = y;
        for line in lines {
            let line_width: f32 = line.iter().map(Atom::width).sum();
            let line_height = line
                .iter()
                .map(|a| match a {
                    Atom::Image { height, .. } => *height,
                    _ => a
                        .node()
                        .map(|n| self.style(n).line_height())
                        .unwrap_or(strut),
                })
                .fold(strut, f32::max);

            let offset = match align.as_str() {
                "center" => ((width - line_width) / 2.0).max(0.0),
                "right" | "end" => (width - line_width).max(0.0),
                _ => 0.0,
            };
            self.emit_line(line, x + offset, cursor, line_height);
            cursor += line_height;
        }
        cursor - y
    }

    fn emit_line(&mut self, line: Vec<Atom>, x: f32, y: f32, line_height: f32) {
        let mut pen = x;
        for atom in line {
            let w = atom.width();
            match atom {
                Atom::Word { node, text, .. } => self.push_text(node, text, pen, y, w, line_height),
                Atom::Space { node, .. } => self.push_text(node, " ".to_string(), pen, y, w, line_height),
                Atom::Image { node, src, width, height } => self.fragments.push(Fragment {
                    node,
                    rect: Rect::new(pen, y + line_height - height, width, height),
                    kind: FragmentKind::Image(src),
                }),
                Atom::Checkbox { node, size, checked } => self.fragments.push(Fragment {
                    node,
                    rect: Rect::new(pen, y + (line_height - size) / 2.0, size, size),
                    kind: FragmentKind::Checkbox { checked },
                }),
                Atom::Break => {}
            }
            pen += w;
        }
    }

    /// Append text, merging with the previous fragment when it continues
    /// the same element on the same line.
    fn push_text(&mut self, node: NodeId, text: String, x: f32, y: f32, width: f32, height: f32) {
        if let Some(last) = self.fragments.last_mut() {
            if last.node == node && last.rect.y == y && (last.rect.right() - x).abs() < 0.01 {
                if let FragmentKind::Text(existing) = &mut last.kind {
                    existing.push_str(&text);
                    last.rect.width += width;
                    return;
                }
            }
        }
        self.fragments.push(Fragment {
            node,
            rect: Rect::new(x, y, width, height),
            kind: FragmentKind::Text(text),
        });
    }

    fn collect_atoms(&self, node: NodeId, parent: NodeId, available: f32, atoms: &mut Vec<Atom>) {
        match &self.doc.node(node).kind {
            NodeKind::Text(text) => {
                let style = self.style(parent);
                let adv = advance(style.font_size());
                if style.get("white-space").is_some_and(|ws| ws.starts_with("pre")) {
                    for (i, segment) in text.split('\n').enumerate() {
                        if i > 0 {
                            atoms.push(Atom::Break);
                        }
                        if !segment.is_empty() {
                            atoms.push(Atom::Word {
                                node: parent,
                                text: segment.to_string(),
                                width: segment.chars().count() as f32 * adv,
                            });
                        }
                    }
                } else {
                    collect_words(text, parent, adv, atoms);
                }
            }
            NodeKind::Element(el) => {
                if self.display(node) == "none" {
                    return;
                }
                match el.tag.as_str() {
                    "br" => atoms.push(Atom::Break),
                    "img" => {
                        let src = el.attr("src").unwrap_or("").to_string();
                        let (width, height) = self.image_size(node, &src, available);
                        atoms.push(Atom::Image {
                            node,
                            src,
                            width,
                            height,
                        });
                    }
                    "input" if el.attr("type") == Some("checkbox") => {
                        let size = self.style(node).font_size() * 0.8;
                        atoms.push(Atom::Checkbox {
                            node,
                            size,
                            checked: el.attr("checked").is_some(),
                        });
                        atoms.push(Atom::Space {
                            node: parent,
                            width: advance(self.style(parent).font_size()),
                        });
                    }
                    _ => {
                        for child in self.doc.children(node) {
                            self.collect_atoms(*child, node, available, atoms);
                        }
                    }
                }
            }
        }
    }

    fn image_size(&self, node: NodeId, src: &str, available: f32) -> (f32, f32) {
        let el = self.doc.element(node);
        let attr = |name: &str| {
            el.and_then(|e| e.attr(name))
                .and_then(|v| v.trim_end_matches("px").parse::<f32>().ok())
        };
        let style = self.style(node);
        let intrinsic = self
            .assets
            .resolve(src)
            .image
            .map(|img| (img.width() as f32, img.height() as f32))
            .unwrap_or((BROKEN_IMAGE_SIZE, BROKEN_IMAGE_SIZE));

        let mut width = style.length("width", available).or_else(|| attr("width"));
        let mut height = style.length("height", 0.0).or_else(|| attr("height"));
        match (width, height) {
            (Some(_), Some(_)) => {}
            (Some(w), None) => height = Some(w * intrinsic.1 / intrinsic.0.max(1.0)),
            (None, Some(h)) => width = Some(h * intrinsic.0 / intrinsic.1.max(1.0)),
            (None, None) => {
                width = Some(intrinsic.0);
                height = Some(intrinsic.1);
            }
        }
        let (mut w, mut h) = (width.unwrap_or(intrinsic.0), height.unwrap_or(intrinsic.1));
        let max = style.length("max-width", available).unwrap_or(available);
        if w > max && w > 0.0 {
            h *= max / w;
            w = max;
        }
        (w, h)
    }
}

/// Split collapsible text into words and single spaces.
fn collect_words(text: &str, node: NodeId, adv: f32, atoms: &mut Vec<Atom>) {
    let mut word = String::new();
    let push_word = |word: &mut String, atoms: &mut Vec<Atom>| {
        if !word.is_empty() {
            atoms.push(Atom::Word {
                node,
                width: word.chars().count() as f32 * adv,
                text: std::mem::take(word),
            });
        }
    };
    for c in text.chars() {
        if c.is_whitespace() {
            push_word(&mut word, atoms);
            if !matches!(atoms.last(), Some(Atom::Space { .. })) {
                atoms.push(Atom::Space { node, width: adv });
            }
        } else {
            word.push(c);
        }
    }
    push_word(&mut word, atoms);
}

/// Greedy line breaking. Words wider than a line are split by character.
fn break_lines(atoms: Vec<Atom>, width: f32) -> Vec<Vec<Atom>> {
    let mut lines: Vec<Vec<Atom>> = vec![Vec::new()];
    let mut used = 0.0f32;

    let mut queue: std::collections::VecDeque<Atom> = atoms.into();
    while let Some(atom) = queue.pop_front() {
        let line_empty = lines.last().map_or(true, |l| l.is_empty());
        match atom {
            Atom::Break => {
                lines.push(Vec::new());
                used = 0.0;
            }
            Atom::Space { .. } if line_empty => {}
            Atom::Word { node, ref text, width: w } if w > width && line_empty && text.chars().count() > 1 => {
                let adv = w / text.chars().count() as f32;
                let fit = ((width / adv).floor() as usize).max(1);
                let head: String = text.chars().take(fit).collect();
                let tail: String = text.chars().skip(fit).collect();
                queue.push_front(Atom::Word {
                    node,
                    width: tail.chars().count() as f32 * adv,
                    text: tail,
                });
                queue.push_front(Atom::Break);
                if let Some(line) = lines.last_mut() {
                    line.push(Atom::Word {
                        node,
                        width: head.chars().count() as f32 * adv,
                        text: head,
                    });
                }
            }
            atom => {
                let w = atom.width();
                if used + w > width && !line_empty {
                    // Trailing space does not carry over
                    if let Some(line) = lines.last_mut() {
                        if matches!(line.last(), Some(Atom::Space { .. })) {
                            line.pop();
                        }
                    }
                    lines.push(Vec::new());
                    used = 0.0;
                    if matches!(atom, Atom::Space { .. }) {
                        continue;
                    }
                }
                used += w;
                if let Some(line) = lines.last_mut() {
                    line.push(atom);
                }
            }
        }
    }

    for line in &mut lines {
        if matches!(line.last(), Some(Atom::Space { .. })) {
            line.pop();
        }
    }
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::StyleSheet;
    use crate::style::compute_styles;

    fn layout(doc: &Document, root: NodeId, width: f32) -> SoftwareLayout {
        let styles = compute_styles(doc);
        layout_tree(doc, &styles, &AssetStore::default(), root, width)
    }

    fn texts(layout: &SoftwareLayout) -> Vec<String> {
        layout
            .fragments
            .iter()
            .filter_map(|f| match &f.kind {
                FragmentKind::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_blocks_stack_with_collapsed_margins() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        for text in ["one", "two"] {
            let p = doc.append_element(root, "p");
            doc.append_text(p, text);
        }
        doc.add_stylesheet(StyleSheet::inline("p { margin: 10px 0; line-height: 20px; font-size: 16px; }"));

        let l = layout(&doc, root, 400.0);
        let boxes: Vec<Rect> = l
            .fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Box && f.node != root)
            .map(|f| f.rect)
            .collect();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].y, 10.0);
        assert_eq!(boxes[1].y, boxes[0].bottom() + 10.0);
        assert_eq!(l.root.height, 10.0 + 20.0 + 10.0 + 20.0 + 10.0);
        assert_eq!(texts(&l), vec!["one", "two"]);
    }

    #[test]
    fn test_word_wrapping() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        doc.append_text(root, "aaaa bbbb cccc");
        doc.add_stylesheet(StyleSheet::inline("div { font-size: 20px; line-height: 30px; }"));

        // advance is 11px; "aaaa bbbb" is 99px
        let l = layout(&doc, root, 100.0);
        assert_eq!(texts(&l), vec!["aaaa bbbb", "cccc"]);
        assert_eq!(l.root.height, 60.0);
    }

    #[test]
    fn test_long_word_splits() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        doc.append_text(root, "abcdefghij");
        doc.add_stylesheet(StyleSheet::inline("div { font-size: 20px; }"));
        let l = layout(&doc, root, 50.0);
        assert_eq!(texts(&l), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_width_max_width_and_centering() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        doc.add_stylesheet(StyleSheet::inline(
            "div { max-width: 200px; margin: 0 auto; padding: 10px; box-sizing: border-box; }",
        ));
        let l = layout(&doc, root, 600.0);
        assert_eq!(l.root.width, 200.0);
        assert_eq!(l.root.x, 200.0);
        assert_eq!(l.root.height, 20.0);
    }

    #[test]
    fn test_pre_preserves_lines() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "pre");
        doc.append_text(root, "fn main() {\n    x\n}");
        let l = layout(&doc, root, 800.0);
        assert_eq!(texts(&l), vec!["fn main() {", "    x", "}"]);
    }

    #[test]
    fn test_ordered_list_markers() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "div");
        let ol = doc.append_element(root, "ol");
        doc.element_mut(ol).unwrap().set_attr("start", "3");
        for t in ["a", "b"] {
            let li = doc.append_element(ol, "li");
            doc.append_text(li, t);
        }
        let l = layout(&doc, root, 400.0);
        assert_eq!(texts(&l), vec!["3.", "a", "4.", "b"]);
    }

    #[test]
    fn test_table_cells_share_row() {
        let mut doc = Document::new();
        let body = doc.body();
        let table = doc.append_element(body, "table");
        let tr = doc.append_element(table, "tr");
        for t in ["x", "y"] {
            let td = doc.append_element(tr, "td");
            doc.append_text(td, t);
        }
        let l = layout(&doc, table, 400.0);
        let cells: Vec<Rect> = l
            .fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Box && doc.element(f.node).unwrap().tag == "td")
            .map(|f| f.rect)
            .collect();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].y, cells[1].y);
        assert_eq!(cells[1].x, 200.0);
        assert_eq!(cells[0].height, cells[1].height);
    }

    #[test]
    fn test_broken_image_gets_placeholder_size() {
        let mut doc = Document::new();
        let body = doc.body();
        let root = doc.append_element(body, "p");
        let img = doc.append_element(root, "img");
        doc.element_mut(img).unwrap().set_attr("src", "missing.png");
        let l = layout(&doc, root, 400.0);
        let image = l
            .fragments
            .iter()
            .find(|f| matches!(f.kind, FragmentKind::Image(_)))
            .unwrap();
        assert_eq!(image.rect.width, BROKEN_IMAGE_SIZE);
    }
}
