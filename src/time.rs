use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Clock that advances once per frame.
///
/// Cleanup throttling and per-asset idle measurement both read the frame start
/// time instead of `Instant::now()`, so every decision made within one frame
/// sees the same timestamp.
pub struct FrameClock {
    epoch: Instant,
    frame_start_nanos: AtomicU64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            frame_start_nanos: AtomicU64::new(0),
        }
    }

    /// Marks the start of a new frame. Called by the render loop before any
    /// drawing or content lookups happen.
    pub fn begin_frame(&self) {
        self.begin_frame_at(Instant::now());
    }

    /// Marks the start of a new frame at an explicit timestamp. Render loops
    /// that already captured a frame timestamp can pass it through here.
    pub fn begin_frame_at(&self, start: Instant) {
        let nanos = start.saturating_duration_since(self.epoch).as_nanos() as u64;
        self.frame_start_nanos.store(nanos, Ordering::Relaxed);
    }

    /// The time the current frame started rendering.
    pub fn frame_time(&self) -> Instant {
        let nanos = self.frame_start_nanos.load(Ordering::Relaxed);
        self.epoch + Duration::from_nanos(nanos)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
