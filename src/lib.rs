//! Markshot
//!
//! Pixel-accurate image snapshots of a themed markdown preview. The live
//! preview is only ever read: the exporter clones the capture target into
//! a detached document, resolves themed variables, stabilizes layout, waits
//! for fonts, rasterizes through a `RenderHost`, and encodes PNG, JPEG or
//! SVG output.
//!
//! ```ignore
//! use markshot::export::{CaptureTarget, ExportOptions, Exporter, PipelineConfig, SoftwareHost};
//!
//! let theme = markshot::theme::presets::dark();
//! let live = markshot::preview::render_preview("# Hello", &theme);
//! let exporter = Exporter::new(SoftwareHost::new(), PipelineConfig::default());
//! let result = exporter
//!     .export(&live, &CaptureTarget::preview(), &theme, &ExportOptions::default())
//!     .await;
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod preview;
pub mod style;
pub mod theme;

pub use error::{Error, Result};
