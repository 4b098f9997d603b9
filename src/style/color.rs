//! CSS color parsing
//!
//! Converts the color syntaxes that appear in theme palettes and preview
//! stylesheets into `image::Rgba<u8>` pixels.

use image::Rgba;

/// Fully transparent black, the CSS `transparent` keyword.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("navy", [0, 0, 128]),
    ("teal", [0, 128, 128]),
];

/// Parse a CSS color value.
///
/// Supports `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()` in both
/// comma and space syntax, `transparent`, and a small set of named colors.
/// Returns `None` for anything else (including `currentColor`, which the
/// cascade resolves before colors reach this function).
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();

    if lower == "transparent" {
        return Some(TRANSPARENT);
    }
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_args(args);
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, [r, g, b])| Rgba([*r, *g, *b, 255]))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba<u8>> {
    // Accept "r, g, b[, a]" and "r g b[ / a]"
    let normalized = args.replace(['/', ','], " ");
    let parts: Vec<&str> = normalized.split_whitespace().collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |s: &str| -> Option<u8> {
        if let Some(pct) = s.strip_suffix('%') {
            let v: f32 = pct.parse().ok()?;
            Some((v.clamp(0.0, 100.0) * 2.55).round() as u8)
        } else {
            let v: f32 = s.parse().ok()?;
            Some(v.clamp(0.0, 255.0).round() as u8)
        }
    };
    let alpha = |s: &str| -> Option<u8> {
        let v: f32 = match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => s.parse().ok()?,
        };
        Some((v.clamp(0.0, 1.0) * 255.0).round() as u8)
    };

    let a = match parts.get(3) {
        Some(s) => alpha(s)?,
        None => 255,
    };
    Some(Rgba([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, a]))
}

/// Source-over blend of `src` onto `dst`.
pub fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src.0[3] as u32;
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst.0[3] as u32;
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        return TRANSPARENT;
    }
    let mix = |s: u8, d: u8| -> u8 {
        ((s as u32 * sa + d as u32 * da * (255 - sa) / 255) / out_a) as u8
    };
    Rgba([
        mix(src.0[0], dst.0[0]),
        mix(src.0[1], dst.0[1]),
        mix(src.0[2], dst.0[2]),
        out_a as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(parse_color("#1a1a1a"), Some(Rgba([26, 26, 26, 255])));
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#00000080"), Some(Rgba([0, 0, 0, 128])));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
    }

    #[test]
    fn test_rgb_forms() {
        assert_eq!(parse_color("rgb(255, 128, 64)"), Some(Rgba([255, 128, 64, 255])));
        assert_eq!(
            parse_color("rgba(128, 128, 128, 0.5)"),
            Some(Rgba([128, 128, 128, 128]))
        );
        assert_eq!(parse_color("rgb(0 255 0 / 50%)"), Some(Rgba([0, 255, 0, 128])));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse_color("transparent"), Some(TRANSPARENT));
        assert_eq!(parse_color("Red"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_color("currentColor"), None);
    }

    #[test]
    fn test_blend() {
        let white = Rgba([255, 255, 255, 255]);
        assert_eq!(blend(white, Rgba([0, 0, 0, 255])), Rgba([0, 0, 0, 255]));
        assert_eq!(blend(white, TRANSPARENT), white);
        let half = blend(white, Rgba([0, 0, 0, 128]));
        assert!(half.0[0] > 100 && half.0[0] < 150);
        assert_eq!(half.0[3], 255);
    }
}
