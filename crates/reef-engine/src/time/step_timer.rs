use std::time::{Duration, Instant};

/// Timing for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StepTime {
    /// Seconds since the previous tick, clamped.
    pub elapsed_seconds: f64,

    /// Sum of every clamped `elapsed_seconds` so far.
    pub total_seconds: f64,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Variable-step frame timer.
///
/// Elapsed time is clamped so a debugger pause or a minimised window does not
/// teleport the camera on the next frame. Total time accumulates the clamped
/// steps, so it lags wall-clock time after a stall.
#[derive(Debug, Clone)]
pub struct StepTimer {
    last: Instant,
    total: Duration,
    frame_index: u64,
    max_step: Duration,
}

impl StepTimer {
    pub const DEFAULT_MAX_STEP: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::with_max_step(Self::DEFAULT_MAX_STEP)
    }

    pub fn with_max_step(max_step: Duration) -> Self {
        Self {
            last: Instant::now(),
            total: Duration::ZERO,
            frame_index: 0,
            max_step,
        }
    }

    /// Resets the baseline without touching the accumulated total.
    ///
    /// Call after a surface reconfigure or when resuming from suspension.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> StepTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> StepTime {
        let dt = now.saturating_duration_since(self.last).min(self.max_step);
        self.last = now;
        self.total += dt;

        let step = StepTime {
            elapsed_seconds: dt.as_secs_f64(),
            total_seconds: self.total.as_secs_f64(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        step
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}
