//! Built-in theme palettes
//!
//! Eight ready-made themes. Each constructor returns a fresh `Theme`; there
//! is no shared mutable registry.

use super::{Theme, ThemeColors, Typography};

fn theme(
    id: &str,
    name: &str,
    description: &str,
    [background, text, accent, code, border, heading, link]: [&str; 7],
) -> Theme {
    Theme {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        colors: ThemeColors {
            background: background.to_string(),
            text: text.to_string(),
            accent: accent.to_string(),
            code: code.to_string(),
            border: Some(border.to_string()),
            heading: Some(heading.to_string()),
            link: Some(link.to_string()),
        },
        typography: Typography::default(),
    }
}

pub fn light() -> Theme {
    theme(
        "light",
        "Light",
        "Clean and professional with excellent readability",
        ["#ffffff", "#1a1a1a", "#3b82f6", "#f3f4f6", "#e5e7eb", "#111827", "#2563eb"],
    )
}

pub fn dark() -> Theme {
    theme(
        "dark",
        "Dark",
        "Easy on the eyes with striking contrast",
        ["#1a1a1a", "#ffffff", "#60a5fa", "#374151", "#374151", "#f9fafb", "#93c5fd"],
    )
}

pub fn warm() -> Theme {
    theme(
        "warm",
        "Warm",
        "Soft, inviting colors perfect for engaging content",
        ["#fefdf9", "#1c1917", "#f59e0b", "#fef3c7", "#fed7aa", "#78350f", "#d97706"],
    )
}

pub fn elegant() -> Theme {
    theme(
        "elegant",
        "Elegant",
        "Modern and stylish for a premium look",
        ["#fafaf9", "#0c0a09", "#6366f1", "#f5f5f4", "#e7e5e4", "#1c1917", "#4f46e5"],
    )
}

pub fn nature() -> Theme {
    theme(
        "nature",
        "Nature",
        "Fresh and organic with natural color tones",
        ["#fefffe", "#14532d", "#22c55e", "#f0fdf4", "#bbf7d0", "#052e16", "#16a34a"],
    )
}

pub fn sunset() -> Theme {
    theme(
        "sunset",
        "Sunset",
        "Warm and vibrant like a beautiful sunset",
        ["#fffbeb", "#9a3412", "#ea580c", "#fed7aa", "#fdba74", "#7c2d12", "#dc2626"],
    )
}

pub fn ocean() -> Theme {
    theme(
        "ocean",
        "Ocean",
        "Calm and serene with blue color palette",
        ["#f8fafc", "#0f172a", "#0ea5e9", "#e0f2fe", "#7dd3fc", "#0c4a6e", "#0284c7"],
    )
}

pub fn mint() -> Theme {
    theme(
        "mint",
        "Mint",
        "Cool and refreshing with mint green accents",
        ["#fdfffe", "#064e3b", "#10b981", "#ecfdf5", "#a7f3d0", "#022c22", "#059669"],
    )
}

/// Get all built-in themes.
pub fn all() -> Vec<Theme> {
    vec![
        light(),
        dark(),
        warm(),
        elegant(),
        nature(),
        sunset(),
        ocean(),
        mint(),
    ]
}

/// Find a built-in theme by id (case-insensitive).
pub fn find(id: &str) -> Option<Theme> {
    all().into_iter().find(|t| t.id.eq_ignore_ascii_case(id))
}
