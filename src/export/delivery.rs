//! Delivery sinks
//!
//! Saving to disk and copying to the system clipboard are independent and
//! never fail the export: every outcome is folded into a `DeliveryReport`
//! whose status line the caller shows to the user.

use std::fmt;
use std::path::{Path, PathBuf};

use arboard::{Clipboard, ImageData};
use image::RgbaImage;
use log::{info, warn};

use super::encoder::EncodedImage;

// ─────────────────────────────────────────────────────────────────────────────
// Delivery Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while delivering an encoded image.
#[derive(Debug)]
pub enum DeliveryError {
    /// Failed to write the image file
    Save { path: PathBuf, source: std::io::Error },
    /// Failed to access the clipboard
    ClipboardAccess(String),
    /// Failed to set clipboard content
    ClipboardWrite(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Save { path, source } => {
                write!(f, "Failed to save '{}': {}", path.display(), source)
            }
            DeliveryError::ClipboardAccess(msg) => write!(f, "Clipboard access error: {}", msg),
            DeliveryError::ClipboardWrite(msg) => write!(f, "Clipboard write error: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Save { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<arboard::Error> for DeliveryError {
    fn from(err: arboard::Error) -> Self {
        DeliveryError::ClipboardWrite(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Save
// ─────────────────────────────────────────────────────────────────────────────

/// Write `encoded` as `dir/file_name`, creating `dir` if needed.
pub fn save(encoded: &EncodedImage, file_name: &str, dir: &Path) -> Result<PathBuf, DeliveryError> {
    let path = dir.join(file_name);
    std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&path, &encoded.bytes))
        .map_err(|source| DeliveryError::Save {
            path: path.clone(),
            source,
        })?;
    info!("Saved {} ({} bytes)", path.display(), encoded.bytes.len());
    Ok(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Clipboard
// ─────────────────────────────────────────────────────────────────────────────

/// A clipboard that can hold an image or plain text.
pub trait ClipboardBackend {
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), DeliveryError>;
    fn set_text(&mut self, text: &str) -> Result<(), DeliveryError>;
}

/// The system clipboard via arboard, opened per operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    fn open() -> Result<Clipboard, DeliveryError> {
        Clipboard::new().map_err(|e| DeliveryError::ClipboardAccess(e.to_string()))
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), DeliveryError> {
        let mut clipboard = Self::open()?;
        clipboard.set_image(ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: image.as_raw().as_slice().into(),
        })?;
        Ok(())
    }

    fn set_text(&mut self, text: &str) -> Result<(), DeliveryError> {
        let mut clipboard = Self::open()?;
        clipboard.set_text(text)?;
        Ok(())
    }
}

/// Put the image on the clipboard, falling back to the data URL as text.
///
/// Returns whether either attempt succeeded.
pub fn copy_image(
    clipboard: &mut dyn ClipboardBackend,
    image: &RgbaImage,
    encoded: &EncodedImage,
) -> bool {
    match clipboard.set_image(image) {
        Ok(()) => {
            info!("Image copied to clipboard");
            return true;
        }
        Err(err) => warn!("Failed to copy image to clipboard: {}", err),
    }
    match clipboard.set_text(&encoded.data_url) {
        Ok(()) => {
            info!("Data URL copied to clipboard as fallback");
            true
        }
        Err(err) => {
            warn!("Clipboard fallback failed: {}", err);
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery Report
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to each requested sink. `None` means not requested.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub saved: Option<Result<PathBuf, DeliveryError>>,
    pub copied: Option<bool>,
}

impl DeliveryReport {
    pub fn saved_path(&self) -> Option<&Path> {
        match &self.saved {
            Some(Ok(path)) => Some(path),
            _ => None,
        }
    }

    /// Whether any requested sink failed.
    pub fn is_partial(&self) -> bool {
        matches!(self.saved, Some(Err(_))) || self.copied == Some(false)
    }

    /// User-facing summary line.
    pub fn status_message(&self) -> String {
        let saved = self.saved.as_ref().map(|r| r.is_ok());
        match (saved, self.copied) {
            (Some(true), Some(true)) => "Image saved & copied to clipboard".to_string(),
            (Some(true), Some(false)) => "Image saved but clipboard copy failed".to_string(),
            (Some(true), None) => match self.saved_path() {
                Some(path) => format!("Image saved to {}", path.display()),
                None => "Image saved".to_string(),
            },
            (Some(false), Some(true)) => "Image copied to clipboard but save failed".to_string(),
            (None, Some(true)) => "Image copied to clipboard".to_string(),
            (None, None) => "Image exported".to_string(),
            (Some(false), _) | (None, Some(false)) => {
                "Image exported but delivery failed".to_string()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::export::encoder::encode;
    use crate::export::ImageFormat;
    use image::Rgba;

    /// In-memory clipboard with switchable failures.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryClipboard {
        pub fail_image: bool,
        pub fail_text: bool,
        pub image: Option<(u32, u32)>,
        pub text: Option<String>,
    }

    impl ClipboardBackend for MemoryClipboard {
        fn set_image(&mut self, image: &RgbaImage) -> Result<(), DeliveryError> {
            if self.fail_image {
                return Err(DeliveryError::ClipboardAccess("no display".into()));
            }
            self.image = Some(image.dimensions());
            Ok(())
        }

        fn set_text(&mut self, text: &str) -> Result<(), DeliveryError> {
            if self.fail_text {
                return Err(DeliveryError::ClipboardWrite("denied".into()));
            }
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    fn sample() -> (RgbaImage, EncodedImage) {
        let image = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        let encoded = encode(&image, ImageFormat::Png, 1.0).unwrap();
        (image, encoded)
    }

    #[test]
    fn test_copy_image_prefers_image() {
        let (image, encoded) = sample();
        let mut clipboard = MemoryClipboard::default();
        assert!(copy_image(&mut clipboard, &image, &encoded));
        assert_eq!(clipboard.image, Some((4, 3)));
        assert!(clipboard.text.is_none());
    }

    #[test]
    fn test_copy_image_falls_back_to_data_url() {
        let (image, encoded) = sample();
        let mut clipboard = MemoryClipboard {
            fail_image: true,
            ..Default::default()
        };
        assert!(copy_image(&mut clipboard, &image, &encoded));
        assert_eq!(clipboard.text.as_deref(), Some(encoded.data_url.as_str()));
    }

    #[test]
    fn test_copy_image_reports_total_failure() {
        let (image, encoded) = sample();
        let mut clipboard = MemoryClipboard {
            fail_image: true,
            fail_text: true,
            ..Default::default()
        };
        assert!(!copy_image(&mut clipboard, &image, &encoded));
    }

    #[test]
    fn test_save_creates_directory() {
        let (_, encoded) = sample();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let path = save(&encoded, "out.png", &target).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), encoded.bytes);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let (_, encoded) = sample();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = save(&encoded, "out.png", &blocker).unwrap_err();
        assert!(matches!(err, DeliveryError::Save { .. }));
    }

    #[test]
    fn test_status_messages() {
        let report = DeliveryReport {
            saved: Some(Ok(PathBuf::from("a.png"))),
            copied: Some(false),
        };
        assert!(report.is_partial());
        assert_eq!(report.status_message(), "Image saved but clipboard copy failed");

        let report = DeliveryReport {
            saved: Some(Ok(PathBuf::from("a.png"))),
            copied: Some(true),
        };
        assert!(!report.is_partial());
        assert_eq!(report.status_message(), "Image saved & copied to clipboard");

        assert_eq!(DeliveryReport::default().status_message(), "Image exported");
    }
}
