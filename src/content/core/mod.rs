pub mod effect;
pub mod font;
pub mod render_target;
pub mod texture;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::content::budget::BudgetTracker;
use crate::time::FrameClock;

/// Capability surface the cache needs from every asset core.
///
/// Allocation itself is not part of the trait: it is kind-specific, takes the
/// GPU context, and only ever runs on the render thread. The cache only frees
/// and inspects.
pub trait AssetCore: Send + Sync {
    fn is_allocated(&self) -> bool;

    /// Estimated device memory held, in bytes. Zero when unallocated.
    fn allocation_size(&self) -> usize;

    /// Whether `clean()` may free this core: allocated and unused for longer
    /// than the idle timeout.
    fn can_be_deleted(&self) -> bool;

    /// Release the device payload but keep the core (and its table entry) for
    /// re-allocation.
    fn free(&self);
}

/// Shared services handed to every core at construction: the frame clock, the
/// idle timeout policy and the allocation counter.
#[derive(Clone)]
pub(crate) struct CoreServices {
    pub clock: Arc<FrameClock>,
    pub idle_timeout: Duration,
    pub budget: BudgetTracker,
}

impl CoreServices {
    pub fn idle_tracker(&self) -> IdleTracker {
        IdleTracker::new(self.clock.clone(), self.idle_timeout)
    }
}

/// Tracks when a core was last touched, measured against the frame clock.
pub(crate) struct IdleTracker {
    clock: Arc<FrameClock>,
    timeout: Duration,
    last_use: Mutex<Instant>,
}

impl IdleTracker {
    pub fn new(clock: Arc<FrameClock>, timeout: Duration) -> Self {
        let now = clock.frame_time();
        Self {
            clock,
            timeout,
            last_use: Mutex::new(now),
        }
    }

    /// Refresh the last-use stamp. Called from every payload accessor.
    pub fn keep_alive(&self) {
        let now = self.clock.frame_time();
        *self.last_use.lock().unwrap() = now;
    }

    /// True once the idle timeout has elapsed since the last use.
    pub fn expired(&self) -> bool {
        let last = *self.last_use.lock().unwrap();
        self.clock.frame_time().saturating_duration_since(last) >= self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_with_nonzero_timeout_is_not_expired() {
        let clock = Arc::new(FrameClock::new());
        clock.begin_frame();
        let tracker = IdleTracker::new(clock, Duration::from_secs(5));
        assert!(!tracker.expired());
    }

    #[test]
    fn tracker_expires_after_timeout_of_frame_time() {
        let clock = Arc::new(FrameClock::new());
        clock.begin_frame();
        let tracker = IdleTracker::new(clock.clone(), Duration::from_secs(5));

        clock.begin_frame_at(Instant::now() + Duration::from_secs(6));
        assert!(tracker.expired());

        // Using the asset again resets the idle clock.
        tracker.keep_alive();
        assert!(!tracker.expired());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let clock = Arc::new(FrameClock::new());
        clock.begin_frame();
        let tracker = IdleTracker::new(clock, Duration::ZERO);
        assert!(tracker.expired());
    }
}
