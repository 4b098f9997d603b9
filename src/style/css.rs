//! Stylesheet parsing
//!
//! Tokenizing is done by `cssparser`, selectors by `selectors` (see
//! `selector.rs`). Style rules and `@font-face` families are collected;
//! other at-rules (`@media`, `@keyframes`, `@import`, ...) are skipped
//! whole. A rule whose selector list does not parse is dropped the way a
//! browser drops it, and reading resumes after its block.

use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};
use log::debug;

use super::selector::{parse_selector_list, Selectors};

// ─────────────────────────────────────────────────────────────────────────────
// Parsed Types
// ─────────────────────────────────────────────────────────────────────────────

/// `name: value [!important]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// A style rule with its selector list.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selectors: Selectors,
    pub declarations: Vec<Declaration>,
}

/// The result of parsing one stylesheet.
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub rules: Vec<Rule>,
    /// Families declared through `@font-face`, lowercase and unquoted
    pub font_faces: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stylesheet Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse stylesheet text. Never fails; unreadable parts are skipped.
pub fn parse_stylesheet(css: &str) -> ParsedSheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut sheet = ParsedSheet::default();

    loop {
        // Equivalent of cssparser's crate-private `skip_cdc_and_cdo`.
        loop {
            let before = parser.state();
            match parser.next_including_whitespace_and_comments() {
                Ok(Token::WhiteSpace(_)) | Ok(Token::Comment(_)) | Ok(Token::CDO) | Ok(Token::CDC) => {}
                _ => {
                    parser.reset(&before);
                    break;
                }
            }
        }
        if parser.is_exhausted() {
            break;
        }
        let state = parser.state();
        let at_keyword = match parser.next() {
            Ok(Token::AtKeyword(name)) => Some(name.to_ascii_lowercase()),
            Ok(_) => None,
            Err(_) => break,
        };
        match at_keyword {
            Some(name) => parse_at_rule(&mut parser, &name, &mut sheet),
            None => {
                parser.reset(&state);
                parse_style_rule(&mut parser, &mut sheet);
            }
        }
    }

    sheet
}

/// Consume an at-rule after its keyword, through its `;` or block.
fn parse_at_rule<'i, 't>(parser: &mut Parser<'i, 't>, name: &str, sheet: &mut ParsedSheet) {
    let has_block = loop {
        match parser.next() {
            Ok(Token::CurlyBracketBlock) => break true,
            Ok(Token::Semicolon) | Err(_) => break false,
            Ok(_) => {}
        }
    };
    if !has_block {
        return;
    }

    if name == "font-face" {
        let declarations = parser
            .parse_nested_block(|p| Ok::<_, ParseError<'i, ()>>(parse_declaration_list(p)))
            .unwrap_or_default();
        if let Some(family) = declarations.iter().find(|d| d.name == "font-family") {
            sheet.font_faces.push(normalize_family(&family.value));
        }
    } else {
        // The block is skipped by the next call to `next()`
        debug!("Skipping unsupported at-rule @{}", name);
    }
}

/// Consume a qualified rule: prelude up to `{`, then its block.
fn parse_style_rule<'i, 't>(parser: &mut Parser<'i, 't>, sheet: &mut ParsedSheet) {
    let start = parser.position();
    let selectors = parser.parse_until_before(Delimiter::CurlyBracketBlock, |p| parse_selector_list(p));
    let prelude = parser.slice_from(start).trim().to_string();

    // `parse_until_before` stops at the block or the end of input
    if !matches!(parser.next(), Ok(Token::CurlyBracketBlock)) {
        return;
    }
    let declarations = parser
        .parse_nested_block(|p| Ok::<_, ParseError<'i, ()>>(parse_declaration_list(p)))
        .unwrap_or_default();

    match selectors {
        Ok(selectors) => sheet.rules.push(Rule {
            selectors,
            declarations,
        }),
        Err(e) => debug!("Dropping rule with selector '{}': {:?}", prelude, e.kind),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a declaration block body (also used for inline styles).
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(body);
    let mut parser = Parser::new(&mut input);
    parse_declaration_list(&mut parser)
}

fn parse_declaration_list<'i, 't>(parser: &mut Parser<'i, 't>) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    while !parser.is_exhausted() {
        // Consumes through the next `;` whatever the closure did
        if let Ok(decl) = parser.parse_until_after(Delimiter::Semicolon, parse_one_declaration) {
            declarations.push(decl);
        }
    }
    declarations
}

fn parse_one_declaration<'i, 't>(parser: &mut Parser<'i, 't>) -> Result<Declaration, ParseError<'i, ()>> {
    let ident = parser.expect_ident()?.clone();
    // Custom property names are case-sensitive
    let name = if ident.starts_with("--") {
        ident.to_string()
    } else {
        ident.to_ascii_lowercase()
    };
    parser.expect_colon()?;

    let start = parser.position();
    let mut end = None;
    loop {
        let before = parser.position();
        let (bang, opens) = match parser.next() {
            Ok(token) => (matches!(token, Token::Delim('!')), opens_block(token)),
            Err(_) => break,
        };
        if opens {
            skip_block(parser);
        }
        if bang && parser.try_parse(|p| p.expect_ident_matching("important")).is_ok() {
            end = Some(before);
            break;
        }
    }
    let value = match end {
        Some(end) => parser.slice(start..end),
        None => parser.slice_from(start),
    }
    .trim();
    if value.is_empty() {
        return Err(parser.new_custom_error(()));
    }

    Ok(Declaration {
        name,
        value: value.to_string(),
        important: end.is_some(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level whitespace-separated components of a value. Functions,
/// blocks and strings stay whole: `1px solid rgba(0, 0, 0, 0.5)` yields
/// three components.
pub fn value_components(value: &str) -> Vec<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut components = Vec::new();
    let mut start = None;

    loop {
        let before = parser.position();
        let token = parser.next_including_whitespace().map(|token| match token {
            Token::WhiteSpace(_) => None,
            token => Some(opens_block(token)),
        });
        let done = token.is_err();
        match token {
            Ok(Some(opens)) => {
                start.get_or_insert(before);
                if opens {
                    skip_block(&mut parser);
                }
            }
            _ => {
                if let Some(start) = start.take() {
                    components.push(parser.slice(start..before).trim().to_string());
                }
            }
        }
        if done {
            break;
        }
    }
    components
}

fn opens_block(token: &Token) -> bool {
    matches!(
        token,
        Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock
    )
}

/// Consume the block just opened so positions land after its end.
fn skip_block<'i, 't>(parser: &mut Parser<'i, 't>) {
    let _ = parser.parse_nested_block(|p| {
        while p.next().is_ok() {}
        Ok::<_, ParseError<'i, ()>>(())
    });
}

/// Top-level comma-separated parts of a value, trimmed, empty parts dropped.
pub fn comma_separated(value: &str) -> Vec<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut parts = Vec::new();

    while !parser.is_exhausted() {
        let start = parser.position();
        let _ = parser.parse_until_before(Delimiter::Comma, |p| {
            while p.next().is_ok() {}
            Ok::<_, ParseError<'_, ()>>(())
        });
        let part = parser.slice_from(start).trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }
        // The comma itself, if any
        let _ = parser.next();
    }
    parts
}

/// Lowercase, unquoted family name. Escapes are decoded and unquoted
/// multi-word names are joined with single spaces.
pub fn normalize_family(family: &str) -> String {
    let mut input = ParserInput::new(family);
    let mut parser = Parser::new(&mut input);
    let mut words = Vec::new();
    while let Ok(token) = parser.next() {
        match token {
            Token::QuotedString(s) | Token::Ident(s) => words.push(s.to_string()),
            _ => {}
        }
    }
    words.join(" ").to_ascii_lowercase()
}

/// Split a `font-family` value into normalized family names.
pub fn font_family_list(value: &str) -> Vec<String> {
    comma_separated(value)
        .iter()
        .map(|f| normalize_family(f))
        .filter(|f| !f.is_empty())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn has_red_paragraph_rule(sheet: &ParsedSheet) -> bool {
        sheet.rules.iter().any(|r| {
            r.declarations
                .iter()
                .any(|d| d.name == "color" && d.value == "red")
        })
    }

    #[test]
    fn test_parse_rules_and_declarations() {
        let sheet = parse_stylesheet(
            "/* c */ .markdown-content h1, h2 { color: red; margin: 0 !important }\np{}",
        );
        assert_eq!(sheet.rules.len(), 2);
        let rule = &sheet.rules[0];
        assert_eq!(rule.selectors.slice().len(), 2);
        assert_eq!(rule.declarations[0].name, "color");
        assert!(rule.declarations[1].important);
        assert_eq!(rule.declarations[1].value, "0");
    }

    #[test]
    fn test_skips_at_rules_and_collects_font_faces() {
        let sheet = parse_stylesheet(
            r#"@import url("x.css");
               @media (max-width: 600px) { p { color: blue; } }
               @font-face { font-family: "Fira Code"; src: url(data:font/woff2;base64,AAAA); }
               p { color: green; }"#,
        );
        assert_eq!(sheet.font_faces, vec!["fira code".to_string()]);
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].declarations[0].value, "green");
    }

    #[test]
    fn test_real_world_sheets_terminate_and_keep_following_rules() {
        let cases = [
            ".md\\:flex { display: flex; } p { color: red; }",
            ".a { content: \"}\"; } .markdown-content p { color: red; }",
            ".a { content: \"{;}\"; } p { color: red; }",
            "p::before { content: '\\201C'; } p { color: red; }",
            "p::-webkit-scrollbar { width: 0; } p { color: red; }",
            "@media (min-width: 640px) { .sm\\:p-4 { padding: 1rem; } } p { color: red; }",
            "@supports (display: grid) { p { color: blue; } } p { color: red; }",
            "@keyframes spin { from { opacity: 0 } to { opacity: 1 } } p { color: red; }",
            "@namespace svg url(http://www.w3.org/2000/svg); svg|rect { fill: red; } p { color: red; }",
            "*|p { color: red; }",
            "p:unknown-state { color: blue; } p { color: red; }",
            ".w-\\[50\\%\\] { width: 50%; } p { color: red; }",
            "p { color: blue; ; ; } p { color: red; }",
            "p { color: blue; bogus } p { color: red }",
            "p { $weird: 1; color: red; }",
            "p ! { color: blue; } p { color: red; }",
            "<!-- p { color: red; } -->",
            "p { background: url(\"a;b}.png\"); color: red; }",
            "/* { */ p { color: red; }",
            "p { color: red",
        ];
        for css in cases {
            let sheet = parse_stylesheet(css);
            assert!(has_red_paragraph_rule(&sheet), "lost the trailing rule in {:?}", css);
        }
    }

    #[test]
    fn test_invalid_selector_drops_only_its_rule() {
        let sheet = parse_stylesheet("a:hover, a { color: blue } p::nonsense, p { color: green } p { color: red }");
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].selectors.slice().len(), 2);
        assert_eq!(sheet.rules[1].declarations[0].value, "red");
    }

    #[test]
    fn test_declaration_values_keep_strings_and_functions() {
        let decls = parse_declarations(
            "content: \"a; b\"; box-shadow: inset 0 0 0 1px rgba(0, 255, 0, 0.6) !important; --Brand-Color: #123",
        );
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].value, "\"a; b\"");
        assert_eq!(decls[1].value, "inset 0 0 0 1px rgba(0, 255, 0, 0.6)");
        assert!(decls[1].important);
        assert_eq!(decls[2].name, "--Brand-Color");
        assert!(parse_declarations("color:").is_empty());
        assert!(parse_declarations("}}}").is_empty());
    }

    #[test]
    fn test_value_components() {
        assert_eq!(
            value_components("  1px solid rgba(0, 0, 0, 0.5) "),
            vec!["1px", "solid", "rgba(0, 0, 0, 0.5)"]
        );
        assert!(value_components("   ").is_empty());
    }

    #[test]
    fn test_font_family_list() {
        assert_eq!(
            font_family_list(r#"'Inter', "Segoe UI", Helvetica Neue, sans-serif"#),
            vec!["inter", "segoe ui", "helvetica neue", "sans-serif"]
        );
        assert_eq!(normalize_family("\"Fira\\ Code\""), "fira code");
        assert!(font_family_list(",,").is_empty());
    }
}
