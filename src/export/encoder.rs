//! Output encoding
//!
//! Turns the final buffer into a self-contained payload (bytes plus a
//! `data:` URL) and names the file it will be saved under.

use std::io::Cursor;

use base64::Engine;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use log::debug;

use super::options::{ImageFormat, MAX_QUALITY, MIN_QUALITY};
use crate::error::{Error, Result};
use crate::style::color::blend;

/// An encoded image ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: ImageFormat,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    /// `data:<mime>;base64,...`
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encode `image` as `format`. `quality` only affects JPEG.
pub fn encode(image: &RgbaImage, format: ImageFormat, quality: f32) -> Result<EncodedImage> {
    let (width, height) = image.dimensions();
    let bytes = match format {
        ImageFormat::Png => encode_png(image)?,
        ImageFormat::Jpg => encode_jpeg(image, quality)?,
        ImageFormat::Svg => {
            let png = encode_png(image).map_err(|e| match e {
                Error::Encoding { message, .. } => Error::Encoding {
                    format: ImageFormat::Svg,
                    message,
                },
                other => other,
            })?;
            wrap_svg(&png, width, height).into_bytes()
        }
    };

    let data_url = format!(
        "data:{};base64,{}",
        format.mime(),
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    );
    debug!("Encoded {}x{} {} ({} bytes)", width, height, format.label(), bytes.len());

    Ok(EncodedImage {
        format,
        mime: format.mime(),
        bytes,
        data_url,
        width,
        height,
    })
}

fn encoding_error(format: ImageFormat) -> impl Fn(image::ImageError) -> Error {
    move |err| Error::Encoding {
        format,
        message: err.to_string(),
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(Cursor::new(&mut bytes))
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(encoding_error(ImageFormat::Png))?;
    Ok(bytes)
}

/// JPEG has no alpha: pixels are flattened onto white first.
fn encode_jpeg(image: &RgbaImage, quality: f32) -> Result<Vec<u8>> {
    let flattened = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = blend(image::Rgba([255, 255, 255, 255]), *image.get_pixel(x, y));
        image::Rgb([px.0[0], px.0[1], px.0[2]])
    });

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut bytes), jpeg_quality(quality))
        .write_image(
            flattened.as_raw(),
            flattened.width(),
            flattened.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(encoding_error(ImageFormat::Jpg))?;
    Ok(bytes)
}

/// Map a 0.1..=1.0 quality onto the JPEG encoder's 1..=100 scale.
fn jpeg_quality(quality: f32) -> u8 {
    let quality = if quality.is_nan() { MAX_QUALITY } else { quality };
    (quality.clamp(MIN_QUALITY, MAX_QUALITY) * 100.0).round() as u8
}

fn wrap_svg(png: &[u8], width: u32, height: u32) -> String {
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" "#,
            r#"width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<image width="{w}" height="{h}" xlink:href="data:image/png;base64,{data}"/></svg>"#
        ),
        w = width,
        h = height,
        data = base64::engine::general_purpose::STANDARD.encode(png)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// File Naming
// ─────────────────────────────────────────────────────────────────────────────

/// `markdown-<theme>[-debug]-<YYYY-MM-DDTHH-MM-SS>.<ext>`
pub fn export_file_name(
    theme_id: &str,
    debug_active: bool,
    format: ImageFormat,
    timestamp: DateTime<Utc>,
) -> String {
    format!(
        "markdown-{}{}-{}.{}",
        theme_id,
        if debug_active { "-debug" } else { "" },
        timestamp.format("%Y-%m-%dT%H-%M-%S"),
        format.extension()
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(8, 6, |x, y| Rgba([(x * 30) as u8, (y * 40) as u8, 90, 255]))
    }

    #[test]
    fn test_png_is_lossless() {
        let encoded = encode(&sample(), ImageFormat::Png, 0.2).unwrap();
        assert_eq!(encoded.mime, "image/png");
        assert!(encoded.data_url.starts_with("data:image/png;base64,"));
        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgba8();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let noisy = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 7 + y * 13) as u8, (x * y) as u8, (x ^ y) as u8, 255])
        });
        let low = encode(&noisy, ImageFormat::Jpg, 0.1).unwrap();
        let high = encode(&noisy, ImageFormat::Jpg, 1.0).unwrap();
        assert_eq!(low.mime, "image/jpeg");
        assert!(low.bytes.len() < high.bytes.len());
        assert_eq!(&high.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        assert_eq!(jpeg_quality(0.0), 10);
        assert_eq!(jpeg_quality(0.85), 85);
        assert_eq!(jpeg_quality(5.0), 100);
        assert_eq!(jpeg_quality(f32::NAN), 100);
    }

    #[test]
    fn test_svg_wraps_png() {
        let encoded = encode(&sample(), ImageFormat::Svg, 1.0).unwrap();
        let text = String::from_utf8(encoded.bytes).unwrap();
        assert!(text.starts_with("<svg"));
        assert!(text.contains(r#"width="8" height="6""#));
        assert!(text.contains("data:image/png;base64,"));
        assert!(encoded.data_url.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_file_name() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            export_file_name("dark", false, ImageFormat::Png, ts),
            "markdown-dark-2024-03-09T14-05-07.png"
        );
        assert_eq!(
            export_file_name("ocean", true, ImageFormat::Jpg, ts),
            "markdown-ocean-debug-2024-03-09T14-05-07.jpg"
        );
    }
}
