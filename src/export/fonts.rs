//! Font-readiness barrier
//!
//! Before pixels are read, every web font the clone actually uses must be
//! loaded. Loads run concurrently and the whole wait is bounded: a font
//! that never settles delays the export by at most the timeout.

use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};

use super::clone::CloneSurface;
use super::host::{FontLoad, RenderHost};
use crate::style::StyleMap;

/// Result of waiting on fonts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontReport {
    /// Families that were awaited
    pub requested: Vec<String>,
    /// Families whose load failed
    pub failed: Vec<String>,
    /// Whether the barrier gave up before every load settled
    pub timed_out: bool,
}

impl FontReport {
    pub fn all_loaded(&self) -> bool {
        !self.timed_out && self.failed.is_empty()
    }
}

/// `@font-face` families referenced by a computed `font-family` in the clone.
pub fn referenced_fonts(surface: &CloneSurface, styles: &StyleMap) -> Vec<String> {
    let declared: BTreeSet<&str> = styles.font_faces().iter().map(String::as_str).collect();
    let doc = surface.document();
    let mut families = BTreeSet::new();
    for id in doc.descendants(surface.root()) {
        if let Some(style) = styles.get(id) {
            for family in style.font_families() {
                if declared.contains(family.as_str()) {
                    families.insert(family);
                }
            }
        }
    }
    families.into_iter().collect()
}

/// Wait until every referenced web font reports loaded, or `timeout` passes.
///
/// Never fails: a timeout or a failed load is logged and reported.
pub async fn wait_for_fonts<H: RenderHost + ?Sized>(
    surface: &CloneSurface,
    styles: &StyleMap,
    host: &H,
    timeout: Duration,
) -> FontReport {
    let requested = referenced_fonts(surface, styles);
    if requested.is_empty() {
        return FontReport::default();
    }
    debug!("Waiting for fonts: {}", requested.join(", "));

    let loads = requested.iter().map(|family| host.load_font(family));
    match tokio::time::timeout(timeout, join_all(loads)).await {
        Ok(results) => {
            let failed: Vec<String> = requested
                .iter()
                .zip(results)
                .filter_map(|(family, load)| match load {
                    FontLoad::Loaded => None,
                    FontLoad::Failed(reason) => {
                        warn!("Font '{}' failed to load: {}", family, reason);
                        Some(family.clone())
                    }
                })
                .collect();
            FontReport {
                requested,
                failed,
                timed_out: false,
            }
        }
        Err(_) => {
            warn!(
                "Fonts not ready after {}ms, capturing anyway",
                timeout.as_millis()
            );
            FontReport {
                requested,
                failed: Vec::new(),
                timed_out: true,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
