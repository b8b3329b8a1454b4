use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::settings::CacheSettings;

/// Shared byte counter for all tracked device allocations.
///
/// Every asset core gets a clone at construction and reports signed deltas on
/// allocate/free. The counter is atomic so the background sweeper can read it
/// while the render thread allocates.
#[derive(Clone)]
pub struct BudgetTracker {
    total: Arc<AtomicI64>,
}

impl BudgetTracker {
    pub fn new() -> Self {
        Self {
            total: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn add(&self, delta: i64) {
        self.total.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed).max(0) as u64
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-pass bounds chosen from the current allocation pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CleanupLimits {
    pub deallocation: usize,
    pub scan: usize,
}

/// Pick cleanup limits for the given total allocation, or `None` when the
/// total is under the low threshold and no cleanup is warranted.
pub(crate) fn cleanup_limits(total: u64, settings: &CacheSettings) -> Option<CleanupLimits> {
    if total <= settings.low_cleanup_threshold {
        return None;
    }
    if total > settings.high_cleanup_threshold {
        Some(CleanupLimits {
            deallocation: settings.high_deallocation_limit,
            scan: settings.high_scan_limit,
        })
    } else {
        Some(CleanupLimits {
            deallocation: settings.low_deallocation_limit,
            scan: settings.low_scan_limit,
        })
    }
}

/// Choose the delay before the next cleanup pass. A pass that consumed its
/// whole deallocation limit probably left eligible cores behind, so the next
/// one comes sooner; a pass with spare capacity relaxes the cadence.
pub(crate) fn next_cleanup_interval(
    deallocations_remaining: usize,
    settings: &CacheSettings,
) -> Duration {
    if deallocations_remaining == 0 {
        settings.short_cleanup_interval()
    } else {
        settings.long_cleanup_interval()
    }
}
