//! Output compositing
//!
//! Separates output sharpness from the host's native capture scale: when the
//! host did not oversample as far as requested, the capture is redrawn into
//! a larger buffer with smoothing.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::debug;

use super::host::Capture;

/// Produce the final buffer for `requested_scale`.
///
/// A capture whose native scale already meets the request is returned as is.
pub fn composite(capture: Capture, requested_scale: u32) -> RgbaImage {
    let native = capture.native_scale.max(1);
    if requested_scale <= native {
        return capture.image;
    }

    let (w, h) = capture.image.dimensions();
    let width = w * requested_scale / native;
    let height = h * requested_scale / native;
    debug!(
        "Compositing {}x{} -> {}x{} ({}x over native {}x)",
        w, h, width, height, requested_scale, native
    );
    imageops::resize(&capture.image, width, height, FilterType::CatmullRom)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn capture(w: u32, h: u32, native_scale: u32) -> Capture {
        Capture {
            image: RgbaImage::from_pixel(w, h, Rgba([40, 80, 120, 255])),
            native_scale,
        }
    }

    #[test]
    fn test_upscales_when_native_scale_short() {
        let out = composite(capture(10, 5, 1), 3);
        assert_eq!(out.dimensions(), (30, 15));
        assert_eq!(*out.get_pixel(15, 7), Rgba([40, 80, 120, 255]));
    }

    #[test]
    fn test_partial_native_scale() {
        let out = composite(capture(20, 10, 2), 4);
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn test_passthrough_when_already_scaled() {
        assert_eq!(composite(capture(20, 10, 2), 2).dimensions(), (20, 10));
        assert_eq!(composite(capture(7, 3, 1), 1).dimensions(), (7, 3));
    }
}
