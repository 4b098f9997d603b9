//! Markdown to preview tree
//!
//! Parses markdown with comrak and converts the AST into a `Document`: the
//! themed container the exporter captures, plus the stylesheets the live
//! preview renders with.

use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, Options};

use crate::dom::{Document, NodeId, StyleSheet};
use crate::theme::Theme;

/// Element id of the preview container.
pub const PREVIEW_CONTENT_ID: &str = "preview-content";

pub const THEME_STYLESHEET_ID: &str = "theme-variables";
pub const BASE_STYLESHEET_ID: &str = "preview-base";

/// Shown when the editor is empty.
pub const WELCOME_MARKDOWN: &str = "# Welcome to Markshot\n\n\
Start typing in the editor to see your content here!\n\n\
You can use inline code like `npm install` or `git commit` in your markdown.";

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

fn comrak_options() -> Options {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options
}

/// Build the live preview tree for `markdown` under `theme`.
pub fn render_preview(markdown: &str, theme: &Theme) -> Document {
    let source = if markdown.trim().is_empty() {
        WELCOME_MARKDOWN
    } else {
        markdown
    };

    let mut doc = Document::new();
    doc.add_stylesheet(StyleSheet::inline_with_id(
        THEME_STYLESHEET_ID,
        theme.variables_css(),
    ));
    doc.add_stylesheet(StyleSheet::inline_with_id(BASE_STYLESHEET_ID, base_css(theme)));

    let body = doc.body();
    let container = doc.append_element(body, "div");
    if let Some(el) = doc.element_mut(container) {
        el.set_attr("id", PREVIEW_CONTENT_ID);
        el.add_class("markdown-content");
        el.add_class(&theme.class_name());
    }

    let arena = Arena::new();
    let root = parse_document(&arena, source, &comrak_options());
    for child in root.children() {
        convert(&mut doc, container, child);
    }
    doc
}

fn set_attr(doc: &mut Document, id: NodeId, name: &str, value: &str) {
    if let Some(el) = doc.element_mut(id) {
        el.set_attr(name, value);
    }
}

fn convert<'a>(doc: &mut Document, parent: NodeId, node: &'a AstNode<'a>) {
    let value = node.data.borrow().value.clone();
    let container = match value {
        NodeValue::Paragraph => doc.append_element(parent, "p"),
        NodeValue::Heading(heading) => {
            doc.append_element(parent, &format!("h{}", heading.level.clamp(1, 6)))
        }
        NodeValue::BlockQuote => doc.append_element(parent, "blockquote"),
        NodeValue::List(list) => {
            let ordered = list.list_type == ListType::Ordered;
            let id = doc.append_element(parent, if ordered { "ol" } else { "ul" });
            if ordered && list.start != 1 {
                set_attr(doc, id, "start", &list.start.to_string());
            }
            id
        }
        NodeValue::Item(_) => doc.append_element(parent, "li"),
        NodeValue::TaskItem(mark) => {
            let li = doc.append_element(parent, "li");
            if let Some(el) = doc.element_mut(li) {
                el.add_class("task-list-item");
            }
            let input = doc.append_element(li, "input");
            set_attr(doc, input, "type", "checkbox");
            set_attr(doc, input, "disabled", "");
            if mark.is_some_and(|c| c != ' ') {
                set_attr(doc, input, "checked", "");
            }
            li
        }
        NodeValue::CodeBlock(block) => {
            let pre = doc.append_element(parent, "pre");
            let code = doc.append_element(pre, "code");
            let lang = block.info.split_whitespace().next().unwrap_or("");
            if !lang.is_empty() {
                if let Some(el) = doc.element_mut(code) {
                    el.add_class(&format!("language-{}", lang));
                }
            }
            doc.append_text(code, block.literal.trim_end_matches('\n'));
            return;
        }
        NodeValue::ThematicBreak => {
            doc.append_element(parent, "hr");
            return;
        }
        NodeValue::Table(_) => doc.append_element(parent, "table"),
        NodeValue::TableRow(_) => doc.append_element(parent, "tr"),
        NodeValue::TableCell => {
            let header = node
                .parent()
                .is_some_and(|row| matches!(row.data.borrow().value, NodeValue::TableRow(true)));
            doc.append_element(parent, if header { "th" } else { "td" })
        }
        NodeValue::Text(text) => {
            doc.append_text(parent, &text);
            return;
        }
        NodeValue::SoftBreak => {
            doc.append_text(parent, " ");
            return;
        }
        NodeValue::LineBreak => {
            doc.append_element(parent, "br");
            return;
        }
        NodeValue::Code(code) => {
            let id = doc.append_element(parent, "code");
            doc.append_text(id, &code.literal);
            return;
        }
        // Raw HTML is shown as text rather than interpreted
        NodeValue::HtmlBlock(html) => {
            let p = doc.append_element(parent, "p");
            doc.append_text(p, html.literal.trim_end());
            return;
        }
        NodeValue::HtmlInline(html) => {
            doc.append_text(parent, &html);
            return;
        }
        NodeValue::Emph => doc.append_element(parent, "em"),
        NodeValue::Strong => doc.append_element(parent, "strong"),
        NodeValue::Strikethrough => doc.append_element(parent, "del"),
        NodeValue::Superscript => doc.append_element(parent, "sup"),
        NodeValue::Link(link) => {
            let a = doc.append_element(parent, "a");
            set_attr(doc, a, "href", &link.url);
            if !link.title.is_empty() {
                set_attr(doc, a, "title", &link.title);
            }
            a
        }
        NodeValue::Image(link) => {
            let img = doc.append_element(parent, "img");
            set_attr(doc, img, "src", &link.url);
            set_attr(doc, img, "alt", &alt_text(node));
            return;
        }
        NodeValue::FootnoteReference(reference) => {
            let sup = doc.append_element(parent, "sup");
            doc.append_text(sup, &format!("[{}]", reference.name));
            return;
        }
        NodeValue::FootnoteDefinition(_) => {
            let div = doc.append_element(parent, "div");
            if let Some(el) = doc.element_mut(div) {
                el.add_class("footnote");
            }
            div
        }
        NodeValue::FrontMatter(_) => return,
        _ => parent,
    };

    for child in node.children() {
        convert(doc, container, child);
    }
}

fn alt_text<'a>(node: &'a AstNode<'a>) -> String {
    node.descendants()
        .skip(1)
        .filter_map(|n| match &n.data.borrow().value {
            NodeValue::Text(text) => Some(text.clone()),
            NodeValue::Code(code) => Some(code.literal.clone()),
            _ => None,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Base Stylesheet
// ─────────────────────────────────────────────────────────────────────────────

/// Preview styles expressed through `theme`'s themed variables.
pub fn base_css(theme: &Theme) -> String {
    let typography = &theme.typography;
    format!(
        r#"
.markdown-content {{
    background-color: var(--theme-{id}-bg);
    color: var(--theme-{id}-text);
    font-family: {font_family};
    font-size: {font_size};
    line-height: {line_height};
    padding: 2rem;
    max-width: 800px;
    margin: 0 auto;
    box-sizing: border-box;
}}

.markdown-content h1,
.markdown-content h2,
.markdown-content h3,
.markdown-content h4,
.markdown-content h5,
.markdown-content h6 {{
    color: var(--theme-{id}-heading);
    font-family: {heading_font};
    line-height: 1.3;
    margin-top: 1.5em;
    margin-bottom: 0.5em;
}}

.markdown-content h1 {{
    font-size: 2.25em;
    padding-bottom: 0.3em;
    border-bottom: 2px solid var(--theme-{id}-border);
}}

.markdown-content h2 {{
    font-size: 1.75em;
    padding-bottom: 0.3em;
    border-bottom: 1px solid var(--theme-{id}-border);
}}

.markdown-content h3 {{
    font-size: 1.375em;
}}

.markdown-content a {{
    color: var(--theme-{id}-link);
}}

.markdown-content code {{
    background-color: var(--theme-{id}-code);
    font-family: "SF Mono", Monaco, Consolas, monospace;
    font-size: 0.875em;
    padding: 0.125em 0.25em;
}}

.markdown-content pre {{
    background-color: var(--theme-{id}-code);
    border: 1px solid var(--theme-{id}-border);
    padding: 1em;
    line-height: 1.5;
}}

.markdown-content pre code {{
    background-color: transparent;
    padding: 0;
}}

.markdown-content blockquote {{
    border-left: 4px solid var(--theme-{id}-accent);
    padding-left: 1em;
    margin-left: 0;
    margin-right: 0;
}}

.markdown-content th,
.markdown-content td {{
    border: 1px solid var(--theme-{id}-border);
    padding: 0.5em 0.75em;
}}

.markdown-content th {{
    background-color: var(--theme-{id}-code);
}}

.markdown-content hr {{
    border-top: 1px solid var(--theme-{id}-border);
}}

.markdown-content li.task-list-item {{
    list-style-type: none;
}}

.markdown-content img {{
    max-width: 100%;
}}
"#,
        id = theme.id,
        font_family = typography.font_family,
        font_size = typography.font_size,
        line_height = typography.line_height,
        heading_font = typography
            .heading_font
            .as_deref()
            .unwrap_or(&typography.font_family),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::compute_styles;
    use crate::theme::presets;

    fn container(doc: &Document) -> NodeId {
        doc.get_element_by_id(PREVIEW_CONTENT_ID).unwrap()
    }

    #[test]
    fn test_container_identity() {
        let theme = presets::ocean();
        let doc = render_preview("Hello", &theme);
        let el = doc.element(container(&doc)).unwrap();
        assert!(el.has_class("markdown-content"));
        assert!(el.has_class("theme-ocean"));
        assert!(doc.has_stylesheet(THEME_STYLESHEET_ID));
        assert!(doc.has_stylesheet(BASE_STYLESHEET_ID));
    }

    #[test]
    fn test_empty_input_shows_welcome() {
        let doc = render_preview("  \n", &presets::light());
        let text = doc.text_content(container(&doc));
        assert!(text.contains("Welcome to Markshot"));
        assert!(text.contains("npm install"));
    }

    #[test]
    fn test_block_structure() {
        let md = "# Title\n\nPara with **bold** and `code`.\n\n1. one\n2. two\n\n```rust\nfn main() {}\n```\n\n---";
        let doc = render_preview(md, &presets::light());
        let root = container(&doc);
        assert_eq!(doc.elements_by_tag(root, &["h1"]).len(), 1);
        assert_eq!(doc.elements_by_tag(root, &["strong"]).len(), 1);
        assert_eq!(doc.elements_by_tag(root, &["li"]).len(), 2);
        assert_eq!(doc.elements_by_tag(root, &["hr"]).len(), 1);
        let code = doc.elements_by_tag(root, &["pre"])[0];
        assert_eq!(doc.text_content(code), "fn main() {}");
        let inner = doc.elements_by_tag(code, &["code"])[0];
        assert!(doc.element(inner).unwrap().has_class("language-rust"));
    }

    #[test]
    fn test_task_list_and_table() {
        let md = "- [x] done\n- [ ] todo\n\n| a | b |\n|---|---|\n| 1 | 2 |";
        let doc = render_preview(md, &presets::light());
        let root = container(&doc);
        let items = doc.elements_by_tag(root, &["li"]);
        assert!(items
            .iter()
            .all(|li| doc.element(*li).unwrap().has_class("task-list-item")));
        let boxes = doc.elements_by_tag(root, &["input"]);
        assert_eq!(boxes.len(), 2);
        assert!(doc.element(boxes[0]).unwrap().attr("checked").is_some());
        assert!(doc.element(boxes[1]).unwrap().attr("checked").is_none());

        assert_eq!(doc.elements_by_tag(root, &["th"]).len(), 2);
        assert_eq!(doc.elements_by_tag(root, &["td"]).len(), 2);
    }

    #[test]
    fn test_image_alt_and_link() {
        let doc = render_preview("[site](https://a.example) ![the *alt*](pic.png)", &presets::light());
        let root = container(&doc);
        let a = doc.elements_by_tag(root, &["a"])[0];
        assert_eq!(doc.element(a).unwrap().attr("href"), Some("https://a.example"));
        let img = doc.elements_by_tag(root, &["img"])[0];
        assert_eq!(doc.element(img).unwrap().attr("alt"), Some("the alt"));
    }

    #[test]
    fn test_live_styles_resolve_through_theme_variables() {
        let theme = presets::dark();
        let doc = render_preview("# Heading\n\ntext", &theme);
        let styles = compute_styles(&doc);
        let root = container(&doc);
        assert_eq!(styles.get(root).unwrap().get("background-color"), Some("#1a1a1a"));
        let h1 = doc.elements_by_tag(root, &["h1"])[0];
        assert_eq!(styles.get(h1).unwrap().get("color"), Some("#f9fafb"));
    }
}
