//! Frame timing for the render loop.

use std::time::{Duration, Instant};

/// Tracks wall-clock frame deltas. The simulation itself advances by a fixed
/// step per tick; this only feeds frame-rate reporting.
#[derive(Debug)]
pub struct Time {
    /// Time of the last frame.
    last_frame: Instant,
    /// Frame count since start.
    frame_count: u64,
    /// Frames and time accumulated since the last report.
    window_frames: u32,
    window_time: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            frame_count: 0,
            window_frames: 0,
            window_time: Duration::ZERO,
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.advance(now - self.last_frame);
        self.last_frame = now;
    }

    fn advance(&mut self, delta: Duration) {
        self.frame_count += 1;
        self.window_frames += 1;
        self.window_time += delta;
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average FPS over the frames since the last report, once at least `every` has passed.
    pub fn take_report(&mut self, every: Duration) -> Option<f32> {
        if self.window_time < every || self.window_frames == 0 {
            return None;
        }
        let fps = self.window_frames as f32 / self.window_time.as_secs_f32();
        self.window_frames = 0;
        self.window_time = Duration::ZERO;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_waits_for_window() {
        let mut time = Time::new();
        for _ in 0..30 {
            time.advance(Duration::from_millis(10));
        }
        assert!(time.take_report(Duration::from_secs(1)).is_none());
        for _ in 0..70 {
            time.advance(Duration::from_millis(10));
        }
        let fps = time.take_report(Duration::from_secs(1)).expect("window elapsed");
        assert!((fps - 100.0).abs() < 0.5, "fps = {}", fps);
        assert!(time.take_report(Duration::from_secs(1)).is_none());
        assert_eq!(time.frame_count(), 100);
    }
}
