//! Export controller
//!
//! The call-site side of an export: rejects re-entrant triggers, refuses to
//! export an empty document, hands a finished image to the delivery sinks,
//! and keeps the tri-state status the UI displays.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use super::clone::CaptureTarget;
use super::delivery::{copy_image, save, ClipboardBackend, DeliveryReport};
use super::host::RenderHost;
use super::options::ExportOptions;
use super::pipeline::{ExportResult, Exporter};
use super::status::{ExportStatus, StatusTracker, NOTHING_TO_EXPORT};
use crate::dom::Document;
use crate::theme::Theme;

/// Where a finished export goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Save into this directory; `None` skips saving
    pub save_dir: Option<PathBuf>,
    pub copy_to_clipboard: bool,
    pub open_after_save: bool,
}

/// Everything one accepted trigger produced.
#[derive(Debug)]
pub struct ExportOutcome {
    /// `None` when nothing was exported because the source was empty
    pub result: Option<ExportResult>,
    pub delivery: Option<DeliveryReport>,
    pub status: ExportStatus,
}

/// Clears the in-flight flag when the trigger finishes, however it exits.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ExportController<H: RenderHost, C: ClipboardBackend> {
    exporter: Exporter<H>,
    delivery: DeliveryConfig,
    clipboard: Mutex<C>,
    status: Mutex<StatusTracker>,
    in_flight: AtomicBool,
}

impl<H: RenderHost, C: ClipboardBackend> ExportController<H, C> {
    pub fn new(exporter: Exporter<H>, delivery: DeliveryConfig, clipboard: C, status_reset: Duration) -> Self {
        Self {
            exporter,
            delivery,
            clipboard: Mutex::new(clipboard),
            status: Mutex::new(StatusTracker::new(status_reset)),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Current status, already reset to idle if its interval passed.
    pub fn status(&self) -> ExportStatus {
        self.tracker().current().clone()
    }

    fn tracker(&self) -> MutexGuard<'_, StatusTracker> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one export of `live` for the markdown `source`.
    ///
    /// Returns `None` without doing anything while another export is in
    /// flight.
    pub async fn trigger(
        &self,
        source: &str,
        live: &Document,
        target: &CaptureTarget,
        theme: &Theme,
        options: &ExportOptions,
    ) -> Option<ExportOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Export already in progress, ignoring trigger");
            return None;
        }
        let _in_flight = InFlight(&self.in_flight);
        self.tracker().set(ExportStatus::Idle);

        if source.trim().is_empty() {
            let status = ExportStatus::Error(NOTHING_TO_EXPORT.to_string());
            self.tracker().set(status.clone());
            return Some(ExportOutcome {
                result: None,
                delivery: None,
                status,
            });
        }

        let result = self.exporter.export(live, target, theme, options).await;
        let (delivery, status) = match result.success() {
            Some(success) => {
                let report = self.deliver(success);
                let status = ExportStatus::Success(report.status_message());
                (Some(report), status)
            }
            None => {
                let message = result
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Export failed".to_string());
                (None, ExportStatus::Error(message))
            }
        };
        self.tracker().set(status.clone());

        Some(ExportOutcome {
            result: Some(result),
            delivery,
            status,
        })
    }

    fn deliver(&self, success: &super::pipeline::ExportSuccess) -> DeliveryReport {
        let saved = self.delivery.save_dir.as_ref().map(|dir| {
            let saved = save(&success.encoded, &success.file_name, dir);
            if let Err(err) = &saved {
                warn!("{}", err);
            }
            saved
        });

        if self.delivery.open_after_save {
            if let Some(Ok(path)) = &saved {
                if let Err(err) = open::that(path) {
                    warn!("Failed to open '{}': {}", path.display(), err);
                }
            }
        }

        let copied = self.delivery.copy_to_clipboard.then(|| {
            let mut clipboard = self.clipboard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            copy_image(&mut *clipboard, &success.image, &success.encoded)
        });

        DeliveryReport { saved, copied }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
