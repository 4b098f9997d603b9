//! Image assets known to the software host
//!
//! `data:` URIs are decoded on demand. Anything else must be registered
//! up front together with its origin flags; unknown sources resolve to a
//! broken image.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use image::RgbaImage;
use log::debug;

/// A resolved image source.
#[derive(Debug, Clone, Default)]
pub struct Asset {
    /// Decoded pixels, `None` when the source is missing or undecodable
    pub image: Option<Arc<RgbaImage>>,
    /// Served from a different origin than the preview
    pub cross_origin: bool,
    /// Served with CORS headers that allow reading its pixels
    pub cors: bool,
}

impl Asset {
    pub fn same_origin(image: RgbaImage) -> Self {
        Self {
            image: Some(Arc::new(image)),
            cross_origin: false,
            cors: false,
        }
    }

    pub fn cross_origin(image: RgbaImage, cors: bool) -> Self {
        Self {
            image: Some(Arc::new(image)),
            cross_origin: true,
            cors,
        }
    }

    pub fn broken() -> Self {
        Self::default()
    }

    /// Whether drawing this asset would taint the canvas under the given
    /// CORS setting.
    pub fn taints(&self, use_cors: bool) -> bool {
        self.cross_origin && !(use_cors && self.cors)
    }
}

/// Registered assets by `src`.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    assets: HashMap<String, Asset>,
}

impl AssetStore {
    pub fn insert(&mut self, src: &str, asset: Asset) {
        self.assets.insert(src.to_string(), asset);
    }

    /// Resolve `src`, decoding `data:` URIs.
    pub fn resolve(&self, src: &str) -> Asset {
        if let Some(asset) = self.assets.get(src) {
            return asset.clone();
        }
        if src.starts_with("data:") {
            return match decode_data_uri(src) {
                Some(image) => Asset::same_origin(image),
                None => {
                    debug!("Undecodable data URI image ({} bytes)", src.len());
                    Asset::broken()
                }
            };
        }
        Asset::broken()
    }
}

/// Decode a base64 `data:image/...` URI into pixels.
pub fn decode_data_uri(uri: &str) -> Option<RgbaImage> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    image::load_from_memory(&bytes).ok().map(|img| img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_data_uri() -> String {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn test_data_uri_decoding() {
        let store = AssetStore::default();
        let asset = store.resolve(&png_data_uri());
        let image = asset.image.unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert!(!asset.cross_origin);
    }

    #[test]
    fn test_unknown_and_invalid_sources_are_broken() {
        let store = AssetStore::default();
        assert!(store.resolve("https://example.com/a.png").image.is_none());
        assert!(store.resolve("data:image/png;base64,!!!").image.is_none());
        assert!(store.resolve("data:text/plain,hello").image.is_none());
    }

    #[test]
    fn test_taint_rules() {
        let img = RgbaImage::new(1, 1);
        assert!(!Asset::same_origin(img.clone()).taints(true));
        assert!(!Asset::cross_origin(img.clone(), true).taints(true));
        assert!(Asset::cross_origin(img.clone(), true).taints(false));
        assert!(Asset::cross_origin(img, false).taints(true));
    }
}
