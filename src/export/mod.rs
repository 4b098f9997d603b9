//! Snapshot Export Module for Markshot
//!
//! This module turns the themed markdown preview into a PNG, JPEG or SVG
//! image without ever touching the live preview tree.
//!
//! # Pipeline
//!
//! - `clone.rs` - Detached copy of the capture target with resolved styles
//! - `snapshot.rs` - Scoped inline-style borrowing with guaranteed restore
//! - `layout.rs` - Natural-flow and fixed-width layout stabilization
//! - `fonts.rs` - Bounded font-readiness barrier
//! - `raster.rs` - Style-adjustment hook and capture driver
//! - `compositor.rs` - Upscaling when native oversampling fell short
//! - `encoder.rs` - PNG/JPEG/SVG payloads and file naming
//! - `delivery.rs` - Save and clipboard sinks
//! - `pipeline.rs` / `controller.rs` - The export call and its call site
//!
//! # Hosts
//!
//! - `host.rs` - The `RenderHost` trait every rendering surface implements
//! - `software/` - Built-in software host painting through `tiny-skia`
//! - `chrome.rs` - Headless Chrome host (`chrome` feature)

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod clone;
pub mod compositor;
pub mod controller;
pub mod delivery;
pub mod encoder;
pub mod fonts;
pub mod host;
pub mod layout;
pub mod options;
pub mod pipeline;
pub mod raster;
pub mod snapshot;
pub mod software;
pub mod status;

#[cfg(feature = "chrome")]
pub use chrome::ChromeHost;
pub use clone::{clone_target, CaptureTarget, CloneSurface};
pub use controller::{DeliveryConfig, ExportController, ExportOutcome};
pub use delivery::{ClipboardBackend, DeliveryReport, SystemClipboard};
pub use encoder::EncodedImage;
pub use host::RenderHost;
pub use options::{ExportOptions, ImageFormat, LayoutPolicy, RasterMode};
pub use pipeline::{ExportResult, ExportSuccess, Exporter, PipelineConfig};
pub use software::SoftwareHost;
pub use status::ExportStatus;
