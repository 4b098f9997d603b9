//! Export status indicator
//!
//! A tri-state status (idle/success/error) shown next to the export action.
//! Success and error states fall back to idle after a fixed interval; the
//! reset is evaluated lazily whenever the status is read.

use std::time::{Duration, Instant};

pub const DEFAULT_STATUS_RESET: Duration = Duration::from_secs(3);

/// Message for an export attempted on an empty document.
pub const NOTHING_TO_EXPORT: &str = "Nothing to export";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportStatus {
    #[default]
    Idle,
    Success(String),
    Error(String),
}

impl ExportStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, ExportStatus::Idle)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExportStatus::Idle => None,
            ExportStatus::Success(msg) | ExportStatus::Error(msg) => Some(msg),
        }
    }
}

/// Holds the current status and when it was set.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    status: ExportStatus,
    set_at: Option<Instant>,
    reset_after: Duration,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_RESET)
    }
}

impl StatusTracker {
    pub fn new(reset_after: Duration) -> Self {
        Self {
            status: ExportStatus::Idle,
            set_at: None,
            reset_after,
        }
    }

    pub fn set(&mut self, status: ExportStatus) {
        self.set_at_time(status, Instant::now());
    }

    pub fn set_at_time(&mut self, status: ExportStatus, now: Instant) {
        self.set_at = (!status.is_idle()).then_some(now);
        self.status = status;
    }

    pub fn current(&mut self) -> &ExportStatus {
        self.current_at(Instant::now())
    }

    /// Status as of `now`, resetting to idle once the interval has passed.
    pub fn current_at(&mut self, now: Instant) -> &ExportStatus {
        if let Some(set_at) = self.set_at {
            if now.saturating_duration_since(set_at) >= self.reset_after {
                self.status = ExportStatus::Idle;
                self.set_at = None;
            }
        }
        &self.status
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let mut tracker = StatusTracker::default();
        assert!(tracker.current().is_idle());
    }

    #[test]
    fn test_auto_reset() {
        let mut tracker = StatusTracker::new(Duration::from_secs(3));
        let t0 = Instant::now();
        tracker.set_at_time(ExportStatus::Success("done".into()), t0);

        let early = tracker.current_at(t0 + Duration::from_secs(2)).clone();
        assert_eq!(early, ExportStatus::Success("done".into()));
        assert_eq!(early.message(), Some("done"));

        assert!(tracker.current_at(t0 + Duration::from_secs(3)).is_idle());
    }

    #[test]
    fn test_new_status_restarts_timer() {
        let mut tracker = StatusTracker::new(Duration::from_secs(3));
        let t0 = Instant::now();
        tracker.set_at_time(ExportStatus::Error("boom".into()), t0);
        tracker.set_at_time(ExportStatus::Error(NOTHING_TO_EXPORT.into()), t0 + Duration::from_secs(2));
        assert_eq!(
            tracker.current_at(t0 + Duration::from_secs(4)),
            &ExportStatus::Error(NOTHING_TO_EXPORT.into())
        );
    }
}
