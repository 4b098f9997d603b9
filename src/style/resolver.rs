//! Themed variable resolution
//!
//! Preview stylesheets reference theme colors through variables named
//! `--theme-<id>-<suffix>`. Before a stylesheet is attached to a capture
//! surface, every reference belonging to the active theme is replaced by
//! the theme's concrete value so the rasterizer never depends on a
//! `:root` block being present.

use std::sync::OnceLock;

use log::warn;
use regex::{Captures, Regex};

use crate::theme::{ColorRole, Theme};

fn themed_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Group 1 is `<id>-<suffix>`, group 2 the optional fallback, which may
        // hold one level of nested functions such as `rgba(...)`.
        Regex::new(r"var\(\s*--theme-([A-Za-z0-9_-]+)\s*(?:,\s*((?:[^()]|\([^()]*\))*?)\s*)?\)")
            .unwrap_or_else(|e| panic!("themed variable pattern is invalid: {e}"))
    })
}

/// Role suffix of `name` (`<id>-<suffix>`) when it belongs to `theme`.
fn active_suffix<'a>(name: &'a str, theme: &Theme) -> Option<&'a str> {
    name.strip_prefix(theme.id.as_str())?.strip_prefix('-')
}

/// Replace every `var(--theme-<theme.id>-<suffix>[, fallback])` in `css`
/// with the theme's value for that role.
///
/// References to other themes are left alone. A reference to an unknown
/// role of the active theme is logged and falls back to its fallback, or
/// stays literal without one. Never fails.
pub fn resolve_themed_variables(css: &str, theme: &Theme) -> String {
    themed_var_regex()
        .replace_all(css, |caps: &Captures| {
            let whole = &caps[0];
            let Some(suffix) = active_suffix(&caps[1], theme) else {
                return whole.to_string();
            };
            if let Some(role) = ColorRole::from_suffix(suffix) {
                return theme.colors.get(role).to_string();
            }
            match caps.get(2).map(|m| m.as_str()).filter(|f| !f.is_empty()) {
                Some(fallback) => {
                    warn!(
                        "Unmatched themed variable '{}' for theme '{}', using its fallback",
                        whole, theme.id
                    );
                    fallback.to_string()
                }
                None => {
                    warn!(
                        "Unmatched themed variable '{}' for theme '{}', left as-is",
                        whole, theme.id
                    );
                    whole.to_string()
                }
            }
        })
        .into_owned()
}

/// Themed variable references to `theme` still present in `css` whose role
/// the theme defines. Empty after `resolve_themed_variables`.
pub fn unresolved_references(css: &str, theme: &Theme) -> Vec<String> {
    themed_var_regex()
        .captures_iter(css)
        .filter(|caps| {
            active_suffix(&caps[1], theme).is_some_and(|s| ColorRole::from_suffix(s).is_some())
        })
        .map(|caps| caps[0].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::presets;

    #[test]
    fn test_resolves_active_theme_roles() {
        let theme = presets::dark();
        let css = ".x { color: var(--theme-dark-text); background: var( --theme-dark-bg ); }";
        let out = resolve_themed_variables(css, &theme);
        assert_eq!(out, ".x { color: #ffffff; background: #1a1a1a; }");
    }

    #[test]
    fn test_fallback_roles() {
        let mut theme = presets::dark();
        theme.colors.border = None;
        theme.colors.heading = None;
        theme.colors.link = None;
        let out = resolve_themed_variables(
            "var(--theme-dark-border) var(--theme-dark-heading) var(--theme-dark-link)",
            &theme,
        );
        assert_eq!(out, "#ffffff #ffffff #60a5fa");
    }

    #[test]
    fn test_other_themes_and_unknown_roles_untouched() {
        let theme = presets::dark();
        let css = "a { color: var(--theme-light-text); b: var(--theme-dark-shadow); c: var(--other); }";
        assert_eq!(resolve_themed_variables(css, &theme), css);
    }

    #[test]
    fn test_reference_with_fallback() {
        let theme = presets::dark();
        let css = ".x { color: var(--theme-dark-text, #000); border-color: var(--theme-dark-border,rgba(0, 0, 0, 0.5)); }";
        let out = resolve_themed_variables(css, &theme);
        assert!(!out.contains("--theme-dark-text"), "{}", out);
        assert!(!out.contains("--theme-dark-border"), "{}", out);
        assert!(out.starts_with(".x { color: #ffffff;"), "{}", out);
        assert!(unresolved_references(css, &theme).len() == 2);
    }

    #[test]
    fn test_unknown_role_uses_fallback() {
        let theme = presets::dark();
        let out = resolve_themed_variables("a { color: var(--theme-dark-shadow, rgba(0, 0, 0, 0.2)); }", &theme);
        assert_eq!(out, "a { color: rgba(0, 0, 0, 0.2); }");
        let css = "a { color: var(--theme-light-text, #111); }";
        assert_eq!(resolve_themed_variables(css, &theme), css);
    }

    #[test]
    fn test_multi_segment_unknown_role_of_active_theme() {
        let theme = presets::dark();
        let css = "a { color: var(--theme-dark-foo-bar); }";
        assert_eq!(resolve_themed_variables(css, &theme), css);
        assert_eq!(active_suffix("dark-foo-bar", &theme), Some("foo-bar"));
        assert_eq!(active_suffix("darker-text", &theme), None);
        assert_eq!(active_suffix("light-text", &theme), None);
    }

    #[test]
    fn test_hyphenated_theme_id() {
        let mut theme = presets::ocean();
        theme.id = "deep-ocean".to_string();
        let out = resolve_themed_variables("var(--theme-deep-ocean-accent)", &theme);
        assert_eq!(out, theme.colors.accent);
    }

    #[test]
    fn test_round_trip_leaves_no_defined_references() {
        for theme in presets::all() {
            let css: String = ColorRole::all()
                .iter()
                .map(|r| format!(".r-{0} {{ color: var({1}); }}\n", r.suffix(), theme.variable_name(*r)))
                .collect();
            assert!(!unresolved_references(&css, &theme).is_empty());
            let resolved = resolve_themed_variables(&css, &theme);
            assert!(unresolved_references(&resolved, &theme).is_empty(), "{}", theme.id);
        }
    }
}
