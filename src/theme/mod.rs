//! Theme System for Markshot
//!
//! A `Theme` is an immutable record of the colors and typography a preview
//! is rendered with. Themes are passed explicitly into every export call;
//! the pipeline never looks up a "current" theme on its own.
//!
//! # Color Roles
//!
//! - **Required**: background, text, accent, code surface
//! - **Optional**: border (falls back to text), heading (falls back to text),
//!   link (falls back to accent)
//!
//! Each role is exposed to stylesheets as a themed variable of the form
//! `var(--theme-<id>-<suffix>)`; see [`ColorRole::suffix`].

pub mod presets;

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Color Roles
// ─────────────────────────────────────────────────────────────────────────────

/// The color slots a theme can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorRole {
    Background,
    Text,
    Accent,
    Code,
    Border,
    Heading,
    Link,
}

impl ColorRole {
    /// Variable suffix used in `var(--theme-<id>-<suffix>)`.
    pub fn suffix(&self) -> &'static str {
        match self {
            ColorRole::Background => "bg",
            ColorRole::Text => "text",
            ColorRole::Accent => "accent",
            ColorRole::Code => "code",
            ColorRole::Border => "border",
            ColorRole::Heading => "heading",
            ColorRole::Link => "link",
        }
    }

    /// Look a role up by its variable suffix.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::all().iter().copied().find(|r| r.suffix() == suffix)
    }

    /// Get all color roles.
    pub fn all() -> &'static [ColorRole] {
        &[
            ColorRole::Background,
            ColorRole::Text,
            ColorRole::Accent,
            ColorRole::Code,
            ColorRole::Border,
            ColorRole::Heading,
            ColorRole::Link,
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Theme Colors
// ─────────────────────────────────────────────────────────────────────────────

/// Palette of a theme. Values are CSS color strings (`#rrggbb`, `rgb(...)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub background: String,
    pub text: String,
    pub accent: String,
    /// Surface color behind inline code and code blocks
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ThemeColors {
    /// Border color, falling back to the text color.
    pub fn border(&self) -> &str {
        self.border.as_deref().unwrap_or(&self.text)
    }

    /// Heading color, falling back to the text color.
    pub fn heading(&self) -> &str {
        self.heading.as_deref().unwrap_or(&self.text)
    }

    /// Link color, falling back to the accent color.
    pub fn link(&self) -> &str {
        self.link.as_deref().unwrap_or(&self.accent)
    }

    /// Concrete value for a role, with fallbacks applied.
    pub fn get(&self, role: ColorRole) -> &str {
        match role {
            ColorRole::Background => &self.background,
            ColorRole::Text => &self.text,
            ColorRole::Accent => &self.accent,
            ColorRole::Code => &self.code,
            ColorRole::Border => self.border(),
            ColorRole::Heading => self.heading(),
            ColorRole::Link => self.link(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typography
// ─────────────────────────────────────────────────────────────────────────────

/// Font settings of a theme, as CSS values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typography {
    pub font_family: String,
    pub font_size: String,
    pub line_height: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_font: Option<String>,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_family: r#"-apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif"#
                .to_string(),
            font_size: "16px".to_string(),
            line_height: "1.7".to_string(),
            heading_font: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Theme
// ─────────────────────────────────────────────────────────────────────────────

/// A named, immutable visual theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub name: String,
    pub description: String,
    pub colors: ThemeColors,
    pub typography: Typography,
}

impl Theme {
    /// Name of the themed variable for a role, without the `var(...)` wrapper.
    pub fn variable_name(&self, role: ColorRole) -> String {
        format!("--theme-{}-{}", self.id, role.suffix())
    }

    /// CSS class the preview container carries while this theme is active.
    pub fn class_name(&self) -> String {
        format!("theme-{}", self.id)
    }

    /// Check if this is a dark theme (useful for conditional styling).
    pub fn is_dark(&self) -> bool {
        crate::style::color::parse_color(&self.colors.background)
            .map(|c| {
                let [r, g, b, _] = c.0;
                (r as u32 + g as u32 + b as u32) / 3 < 128
            })
            .unwrap_or(false)
    }

    /// The `:root` block declaring every themed variable of this theme.
    pub fn variables_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for role in ColorRole::all() {
            let _ = writeln!(
                css,
                "    {}: {};",
                self.variable_name(*role),
                self.colors.get(*role)
            );
        }
        css.push_str("}\n");
        css
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_theme() -> Theme {
        Theme {
            id: "bare".to_string(),
            name: "Bare".to_string(),
            description: String::new(),
            colors: ThemeColors {
                background: "#000000".to_string(),
                text: "#eeeeee".to_string(),
                accent: "#ff0000".to_string(),
                code: "#222222".to_string(),
                border: None,
                heading: None,
                link: None,
            },
            typography: Typography::default(),
        }
    }

    #[test]
    fn test_optional_roles_fall_back() {
        let theme = bare_theme();
        assert_eq!(theme.colors.border(), "#eeeeee");
        assert_eq!(theme.colors.heading(), "#eeeeee");
        assert_eq!(theme.colors.link(), "#ff0000");
    }

    #[test]
    fn test_explicit_roles_win() {
        let mut theme = bare_theme();
        theme.colors.link = Some("#00ff00".to_string());
        assert_eq!(theme.colors.get(ColorRole::Link), "#00ff00");
    }

    #[test]
    fn test_suffix_round_trip() {
        for role in ColorRole::all() {
            assert_eq!(ColorRole::from_suffix(role.suffix()), Some(*role));
        }
        assert_eq!(ColorRole::from_suffix("shadow"), None);
    }

    #[test]
    fn test_variables_css() {
        let css = bare_theme().variables_css();
        assert!(css.contains("--theme-bare-bg: #000000;"));
        assert!(css.contains("--theme-bare-link: #ff0000;"));
    }

    #[test]
    fn test_is_dark() {
        assert!(bare_theme().is_dark());
        assert!(!presets::light().is_dark());
    }
}
