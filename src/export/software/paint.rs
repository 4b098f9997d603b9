//! Display list and pixel painting for the software host
//!
//! Fragments are turned into a small set of paint commands, which are then
//! filled into a `tiny_skia::Pixmap` at the requested device scale. Text
//! uses 8x8 bitmap glyphs traced as rectangle paths, antialiased when the
//! element asks for smoothing or geometric-precision rendering.

use std::sync::Arc;

use font8x8::{UnicodeFonts, BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, GREEK_FONTS, LATIN_FONTS, MISC_FONTS};
use image::{Rgba, RgbaImage};
use log::warn;
use tiny_skia::{Color, ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Transform};

use super::assets::AssetStore;
use super::layout::{advance, Fragment, FragmentKind, Rect, SoftwareLayout};
use crate::dom::{Document, NodeId};
use crate::error::CaptureError;
use crate::style::color::parse_color;
use crate::style::{ComputedStyle, StyleMap};

const PLACEHOLDER_FILL: Rgba<u8> = Rgba([229, 231, 235, 255]);
const PLACEHOLDER_STROKE: Rgba<u8> = Rgba([156, 163, 175, 255]);

// ─────────────────────────────────────────────────────────────────────────────
// Paint Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationLine {
    Underline,
    LineThrough,
}

#[derive(Debug, Clone)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        color: Rgba<u8>,
    },
    Text {
        /// Top-left of the first glyph cell
        x: f32,
        y: f32,
        /// Glyph cell size in CSS pixels
        size: f32,
        text: String,
        color: Rgba<u8>,
        bold: bool,
        smooth: bool,
        decoration: Option<(DecorationLine, Rgba<u8>)>,
    },
    Image {
        rect: Rect,
        image: Arc<RgbaImage>,
    },
}

/// Options that decide how the display list treats images.
#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    pub use_cors: bool,
    pub allow_taint: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Display List
// ─────────────────────────────────────────────────────────────────────────────

/// Build paint commands for every fragment, in paint order.
///
/// Fails when an image would taint the capture and tainting is not allowed.
pub fn build_display_list(
    doc: &Document,
    styles: &StyleMap,
    layout: &SoftwareLayout,
    assets: &AssetStore,
    policy: ImagePolicy,
) -> Result<Vec<PaintCommand>, CaptureError> {
    let fallback = ComputedStyle::default();
    let mut commands = Vec::new();

    for fragment in &layout.fragments {
        let style = styles.get(fragment.node).unwrap_or(&fallback);
        if style.get("visibility") == Some("hidden") {
            continue;
        }
        let dy = translate_y(doc, styles, fragment.node);
        let rect = Rect { y: fragment.rect.y + dy, ..fragment.rect };

        match &fragment.kind {
            FragmentKind::Box => paint_box(&mut commands, style, rect),
            FragmentKind::Text(text) => paint_text(&mut commands, doc, styles, fragment, text, rect),
            FragmentKind::Image(src) => {
                let asset = assets.resolve(src);
                match asset.image.clone() {
                    Some(image) => {
                        if asset.taints(policy.use_cors) && !policy.allow_taint {
                            return Err(CaptureError::Tainted { src: src.clone() });
                        }
                        commands.push(PaintCommand::Image { rect, image });
                    }
                    None => {
                        warn!("Image '{}' could not be loaded, painting placeholder", truncate(src));
                        commands.push(PaintCommand::SolidRect {
                            rect,
                            color: PLACEHOLDER_FILL,
                        });
                        stroke(&mut commands, rect, 1.0, PLACEHOLDER_STROKE, false);
                    }
                }
            }
            FragmentKind::Checkbox { checked } => {
                let color = style_color(style, "color").unwrap_or(Rgba([0, 0, 0, 255]));
                stroke(&mut commands, rect, 1.0, color, false);
                if *checked {
                    let inset = rect.width / 4.0;
                    commands.push(PaintCommand::SolidRect {
                        rect: Rect::new(
                            rect.x + inset,
                            rect.y + inset,
                            rect.width - 2.0 * inset,
                            rect.height - 2.0 * inset,
                        ),
                        color,
                    });
                }
            }
        }
    }

    Ok(commands)
}

fn truncate(src: &str) -> &str {
    match src.char_indices().nth(64) {
        Some((i, _)) => &src[..i],
        None => src,
    }
}

fn style_color(style: &ComputedStyle, property: &str) -> Option<Rgba<u8>> {
    style.get(property).and_then(parse_color)
}

fn paint_box(commands: &mut Vec<PaintCommand>, style: &ComputedStyle, rect: Rect) {
    if let Some(bg) = style_color(style, "background-color") {
        if bg.0[3] > 0 {
            commands.push(PaintCommand::SolidRect { rect, color: bg });
        }
    }

    let widths = style.border_widths();
    let text_color = style_color(style, "color").unwrap_or(Rgba([0, 0, 0, 255]));
    for (i, side) in ["top", "right", "bottom", "left"].iter().enumerate() {
        let w = widths[i];
        if w <= 0.0 {
            continue;
        }
        let color = style_color(style, &format!("border-{}-color", side)).unwrap_or(text_color);
        let side_rect = match i {
            0 => Rect::new(rect.x, rect.y, rect.width, w),
            1 => Rect::new(rect.right() - w, rect.y, w, rect.height),
            2 => Rect::new(rect.x, rect.bottom() - w, rect.width, w),
            _ => Rect::new(rect.x, rect.y, w, rect.height),
        };
        commands.push(PaintCommand::SolidRect { rect: side_rect, color });
    }

    if let Some((spread, color)) = style.get("box-shadow").and_then(parse_inset_shadow) {
        stroke(commands, rect, spread, color, false);
    }
    if let Some((width, color)) = style.get("outline").and_then(|o| parse_outline(o, text_color)) {
        stroke(commands, rect, width, color, true);
    }
}

/// Four edge rects `width` thick, inside `rect` or around it.
fn stroke(commands: &mut Vec<PaintCommand>, rect: Rect, width: f32, color: Rgba<u8>, outside: bool) {
    let r = if outside {
        Rect::new(rect.x - width, rect.y - width, rect.width + 2.0 * width, rect.height + 2.0 * width)
    } else {
        rect
    };
    for edge in [
        Rect::new(r.x, r.y, r.width, width),
        Rect::new(r.x, r.bottom() - width, r.width, width),
        Rect::new(r.x, r.y + width, width, r.height - 2.0 * width),
        Rect::new(r.right() - width, r.y + width, width, r.height - 2.0 * width),
    ] {
        commands.push(PaintCommand::SolidRect { rect: edge, color });
    }
}

/// `inset 0 0 0 <spread> <color>`, the only box-shadow form painted.
fn parse_inset_shadow(value: &str) -> Option<(f32, Rgba<u8>)> {
    let rest = value.trim().strip_prefix("inset")?.trim();
    let tokens = crate::style::css::value_components(rest);
    let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
    match tokens.as_slice() {
        ["0", "0", "0", spread, color] => {
            let spread = spread.trim_end_matches("px").parse::<f32>().ok()?;
            Some((spread, parse_color(color)?))
        }
        _ => None,
    }
}

fn parse_outline(value: &str, current: Rgba<u8>) -> Option<(f32, Rgba<u8>)> {
    let mut width = None;
    let mut color = current;
    let mut visible = false;
    for token in value.split_whitespace() {
        if let Some(px) = token.strip_suffix("px").and_then(|v| v.parse::<f32>().ok()) {
            width = Some(px);
        } else if let Some(c) = parse_color(token) {
            color = c;
        } else if matches!(token, "solid" | "dotted" | "dashed" | "double") {
            visible = true;
        }
    }
    visible.then_some((width.unwrap_or(3.0), color))
}

fn paint_text(
    commands: &mut Vec<PaintCommand>,
    doc: &Document,
    styles: &StyleMap,
    fragment: &Fragment,
    text: &str,
    rect: Rect,
) {
    let Some(style) = styles.get(fragment.node) else {
        return;
    };
    let color = style_color(style, "color").unwrap_or(Rgba([0, 0, 0, 255]));
    let size = advance(style.font_size());

    // Inline element backgrounds such as `code` spans
    if style.display() == "inline" {
        if let Some(bg) = style_color(style, "background-color").filter(|c| c.0[3] > 0) {
            commands.push(PaintCommand::SolidRect { rect, color: bg });
        }
    }

    let smooth = style.get("-webkit-font-smoothing") == Some("antialiased")
        || style
            .get("text-rendering")
            .is_some_and(|v| v.eq_ignore_ascii_case("geometricPrecision"));

    commands.push(PaintCommand::Text {
        x: rect.x,
        y: rect.y + (rect.height - size) / 2.0,
        size,
        text: text.to_string(),
        color,
        bold: style.is_bold(),
        smooth,
        decoration: decoration(doc, styles, fragment.node, color),
    });
}

/// Decoration from the element or any inline ancestor up to its block.
fn decoration(
    doc: &Document,
    styles: &StyleMap,
    node: NodeId,
    text_color: Rgba<u8>,
) -> Option<(DecorationLine, Rgba<u8>)> {
    let mut current = Some(node);
    while let Some(id) = current {
        let style = styles.get(id)?;
        let line = match style.get("text-decoration-line") {
            Some("underline") => Some(DecorationLine::Underline),
            Some("line-through") => Some(DecorationLine::LineThrough),
            _ => None,
        };
        if let Some(line) = line {
            let color = style_color(style, "text-decoration-color").unwrap_or(text_color);
            return Some((line, color));
        }
        if style.display() != "inline" {
            return None;
        }
        current = doc.parent(id);
    }
    None
}

/// Sum of `translateY(...)` transforms on the node and its ancestors.
fn translate_y(doc: &Document, styles: &StyleMap, node: NodeId) -> f32 {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .filter_map(|id| styles.get(id)?.get("transform"))
        .filter_map(|t| {
            let inner = t.trim().strip_prefix("translateY(")?.strip_suffix(')')?;
            inner.trim().trim_end_matches("px").parse::<f32>().ok()
        })
        .sum()
}

// ─────────────────────────────────────────────────────────────────────────────
// Canvas
// ─────────────────────────────────────────────────────────────────────────────

const BYTES_PER_PIXEL: u64 = 4;

/// Upper bound on one device canvas. Larger requests fail with
/// `CaptureError::Host` instead of aborting on allocation.
pub const MAX_CANVAS_BYTES: u64 = 512 * 1024 * 1024;

/// A device pixmap addressed in CSS pixels relative to `origin`.
pub struct Canvas {
    pixmap: Pixmap,
    /// CSS pixels to device pixels
    transform: Transform,
}

impl Canvas {
    /// A `width`x`height` CSS pixel canvas at `scale`, filled with `background`.
    pub fn new(
        width: u32,
        height: u32,
        scale: u32,
        origin: (f32, f32),
        background: Rgba<u8>,
    ) -> Result<Self, CaptureError> {
        let device_w = u64::from(width) * u64::from(scale);
        let device_h = u64::from(height) * u64::from(scale);
        let bytes = device_w * device_h * BYTES_PER_PIXEL;
        if bytes > MAX_CANVAS_BYTES {
            return Err(CaptureError::Host(format!(
                "canvas of {}x{} device pixels needs {} bytes (limit {})",
                device_w, device_h, bytes, MAX_CANVAS_BYTES
            )));
        }
        // Both sides fit in u32 once the byte limit holds
        let mut pixmap = Pixmap::new(device_w as u32, device_h as u32).ok_or(CaptureError::EmptySurface)?;
        let [r, g, b, a] = background.0;
        pixmap.fill(Color::from_rgba8(r, g, b, a));

        let scale = scale as f32;
        Ok(Self {
            pixmap,
            transform: Transform::from_scale(scale, scale).pre_translate(-origin.0, -origin.1),
        })
    }

    pub fn into_image(self) -> RgbaImage {
        let pixmap = self.pixmap;
        RgbaImage::from_fn(pixmap.width(), pixmap.height(), |x, y| {
            pixmap
                .pixel(x, y)
                .map(|p| {
                    let c = p.demultiply();
                    Rgba([c.red(), c.green(), c.blue(), c.alpha()])
                })
                .unwrap_or(Rgba([0, 0, 0, 0]))
        })
    }

    pub fn execute(&mut self, commands: &[PaintCommand]) {
        for command in commands {
            match command {
                PaintCommand::SolidRect { rect, color } => self.fill_rect(*rect, *color),
                PaintCommand::Text {
                    x,
                    y,
                    size,
                    text,
                    color,
                    bold,
                    smooth,
                    decoration,
                } => {
                    let mut pen = *x;
                    for ch in text.chars() {
                        if !ch.is_whitespace() {
                            self.draw_glyph(ch, pen, *y, *size, *color, *bold, *smooth);
                        }
                        pen += size;
                    }
                    if let Some((line, color)) = decoration {
                        let thickness = (size / 8.0).max(1.0 / self.transform.sx);
                        let line_y = match line {
                            DecorationLine::Underline => y + size + thickness,
                            DecorationLine::LineThrough => y + size / 2.0 - thickness / 2.0,
                        };
                        self.fill_rect(Rect::new(*x, line_y, pen - x, thickness), *color);
                    }
                }
                PaintCommand::Image { rect, image } => self.draw_image(*rect, image),
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let Some(path) = sk_rect(rect).map(PathBuilder::from_rect) else {
            return;
        };
        // Pixel-center sampling keeps box edges crisp
        let paint = solid_paint(color, false);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_glyph(&mut self, ch: char, x: f32, y: f32, size: f32, color: Rgba<u8>, bold: bool, smooth: bool) {
        let cell = size / 8.0;
        if cell <= 0.0 {
            return;
        }
        let bits = glyph(ch);
        // Leftmost pixel is the least significant bit
        let lit = |row: usize, col: i32| {
            let on = |c: i32| (0..8).contains(&c) && (bits[row] >> c) & 1 == 1;
            on(col) || (bold && on(col - 1))
        };

        let mut builder = PathBuilder::new();
        for row in 0..8 {
            let mut col = 0;
            while col < 8 {
                if !lit(row, col) {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < 8 && lit(row, col) {
                    col += 1;
                }
                let run = Rect::new(
                    x + start as f32 * cell,
                    y + row as f32 * cell,
                    (col - start) as f32 * cell,
                    cell,
                );
                if let Some(r) = sk_rect(run) {
                    builder.push_rect(r);
                }
            }
        }
        let Some(path) = builder.finish() else {
            return;
        };
        let paint = solid_paint(color, smooth);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    fn draw_image(&mut self, rect: Rect, image: &RgbaImage) {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let Some(mut source) = Pixmap::new(w, h) else {
            return;
        };
        for (dst, src) in source.pixels_mut().iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        let transform = self
            .transform
            .pre_translate(rect.x, rect.y)
            .pre_scale(rect.width / w as f32, rect.height / h as f32);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }
}

fn sk_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

fn solid_paint(color: Rgba<u8>, anti_alias: bool) -> Paint<'static> {
    let [r, g, b, a] = color.0;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = anti_alias;
    paint
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BOX_FONTS.get(ch))
        .or_else(|| BLOCK_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| MISC_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0xff; 8])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn test_fill_rect_scaled_and_offset() {
        let mut canvas = Canvas::new(10, 10, 2, (5.0, 5.0), WHITE).unwrap();
        canvas.execute(&[PaintCommand::SolidRect {
            rect: Rect::new(5.0, 5.0, 2.0, 1.0),
            color: BLACK,
        }]);
        let img = canvas.into_image();
        assert_eq!(img.dimensions(), (20, 20));
        assert_eq!(*img.get_pixel(3, 1), BLACK);
        assert_eq!(*img.get_pixel(4, 1), WHITE);
        assert_eq!(*img.get_pixel(0, 2), WHITE);
    }

    #[test]
    fn test_text_draws_pixels() {
        let mut canvas = Canvas::new(40, 20, 1, (0.0, 0.0), WHITE).unwrap();
        canvas.execute(&[PaintCommand::Text {
            x: 0.0,
            y: 0.0,
            size: 16.0,
            text: "H".to_string(),
            color: BLACK,
            bold: false,
            smooth: false,
            decoration: None,
        }]);
        let img = canvas.into_image();
        let dark = img.pixels().filter(|p| p.0[0] < 128).count();
        assert!(dark > 0);
        // Nothing beyond the first glyph cell
        assert!((17..40).all(|x| (0..20).all(|y| *img.get_pixel(x, y) == WHITE)));
    }

    #[test]
    fn test_smooth_text_has_partial_coverage() {
        let mut canvas = Canvas::new(20, 20, 1, (0.0, 0.0), WHITE).unwrap();
        canvas.execute(&[PaintCommand::Text {
            x: 0.3,
            y: 0.3,
            size: 12.0,
            text: "O".to_string(),
            color: BLACK,
            bold: false,
            smooth: true,
            decoration: None,
        }]);
        let img = canvas.into_image();
        assert!(img.pixels().any(|p| p.0[0] > 0 && p.0[0] < 255));
    }

    #[test]
    fn test_underline() {
        let mut canvas = Canvas::new(20, 20, 1, (0.0, 0.0), WHITE).unwrap();
        canvas.execute(&[PaintCommand::Text {
            x: 0.0,
            y: 0.0,
            size: 8.0,
            text: " ".to_string(),
            color: BLACK,
            bold: false,
            smooth: false,
            decoration: Some((DecorationLine::Underline, BLACK)),
        }]);
        let img = canvas.into_image();
        assert_eq!(*img.get_pixel(3, 9), BLACK);
    }

    #[test]
    fn test_oversized_canvas_is_refused() {
        let result = Canvas::new(20_000, 20_000, 2, (0.0, 0.0), WHITE);
        assert!(matches!(result, Err(CaptureError::Host(msg)) if msg.contains("limit")));
        assert!(matches!(
            Canvas::new(0, 10, 1, (0.0, 0.0), WHITE),
            Err(CaptureError::EmptySurface)
        ));
    }

    #[test]
    fn test_image_scaled_into_rect() {
        let red = Rgba([255, 0, 0, 255]);
        let source = Arc::new(RgbaImage::from_pixel(2, 2, red));
        let mut canvas = Canvas::new(20, 20, 2, (0.0, 0.0), WHITE).unwrap();
        canvas.execute(&[PaintCommand::Image {
            rect: Rect::new(2.0, 2.0, 4.0, 4.0),
            image: source,
        }]);
        let img = canvas.into_image();
        assert_eq!(*img.get_pixel(8, 8), red);
        assert_eq!(*img.get_pixel(2, 2), WHITE);
        assert_eq!(*img.get_pixel(14, 14), WHITE);
    }

    #[test]
    fn test_parse_shadow_and_outline() {
        assert_eq!(
            parse_inset_shadow("inset 0 0 0 1px rgba(0, 255, 0, 0.6)"),
            Some((1.0, Rgba([0, 255, 0, 153])))
        );
        assert_eq!(parse_inset_shadow("0 1px 2px black"), None);
        assert_eq!(parse_outline("1px dotted red", BLACK), Some((1.0, Rgba([255, 0, 0, 255]))));
        assert_eq!(parse_outline("none", BLACK), None);
    }
}
