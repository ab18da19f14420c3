//! Instantaneous frame-rate tracking.
//!
//! Arrivals are stamped as whole-millisecond ticks counted from the first
//! arrival on the pipe, and the rate comes from the difference between the
//! two most recent ticks. Two arrivals 0.6 ms apart that straddle a tick
//! boundary therefore count as 1 ms apart.

use std::time::Instant;

/// Per-pipe frame-rate state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameRateTracker {
    fps: f64,
    epoch: Option<Instant>,
    last_tick: u128,
}

impl FrameRateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival at `now` and return the updated estimate.
    ///
    /// Arrivals on the same millisecond tick, or on an earlier one, leave
    /// the estimate unchanged.
    pub fn record_at(&mut self, now: Instant) -> f64 {
        let Some(epoch) = self.epoch else {
            self.epoch = Some(now);
            self.last_tick = 0;
            return self.fps;
        };
        let tick = now.saturating_duration_since(epoch).as_millis();
        if tick > self.last_tick {
            self.fps = 1000.0 / (tick - self.last_tick) as f64;
        }
        self.last_tick = tick;
        self.fps
    }

    /// Current estimate; 0 until two frames have arrived.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_frame_is_zero() {
        let mut t = FrameRateTracker::new();
        assert_eq!(t.record_at(Instant::now()), 0.0);
        assert_eq!(t.fps(), 0.0);
    }

    #[test]
    fn rate_from_gap() {
        let mut t = FrameRateTracker::new();
        let start = Instant::now();
        t.record_at(start);
        let fps = t.record_at(start + Duration::from_millis(40));
        assert!((fps - 25.0).abs() < 1e-9);

        let fps = t.record_at(start + Duration::from_millis(40 + 33));
        assert!((fps - 1000.0 / 33.0).abs() < 1e-9);
    }

    #[test]
    fn same_tick_keeps_previous_rate() {
        let mut t = FrameRateTracker::new();
        let start = Instant::now();
        t.record_at(start);
        let at = start + Duration::from_millis(20);
        t.record_at(at);
        assert!((t.record_at(at) - 50.0).abs() < 1e-9);
        // Still inside tick 20.
        let fps = t.record_at(at + Duration::from_micros(500));
        assert!((fps - 50.0).abs() < 1e-9);
    }

    #[test]
    fn sub_millisecond_gap_across_tick_boundary() {
        let mut t = FrameRateTracker::new();
        let start = Instant::now();
        t.record_at(start);
        t.record_at(start + Duration::from_micros(10_700));
        // 10.7 ms -> 11.3 ms crosses from tick 10 to tick 11.
        let fps = t.record_at(start + Duration::from_micros(11_300));
        assert!((fps - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn clock_going_backwards_keeps_previous_rate() {
        let mut t = FrameRateTracker::new();
        let start = Instant::now() + Duration::from_secs(1);
        t.record_at(start);
        t.record_at(start + Duration::from_millis(10));
        let fps = t.record_at(start);
        assert!((fps - 100.0).abs() < 1e-9);
    }
}
