// ABOUTME: Monotonic clock sources used for all scheduling math
// ABOUTME: Tokio Instant-backed clock plus a settable clock for deterministic tests

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic time source in seconds
pub trait Clock {
    /// Current reading in seconds; never decreases
    fn now(&self) -> f64;
}

/// Clock backed by tokio's `Instant`, counting seconds from its creation
///
/// Reads the runtime's paused clock under `tokio::time::pause`, and plain
/// monotonic time otherwise.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose zero is the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Convert a clock reading back to an `Instant`
    ///
    /// Readings before the clock origin clamp to the origin.
    pub fn instant_at(&self, seconds: f64) -> Instant {
        if seconds <= 0.0 || !seconds.is_finite() {
            return self.origin;
        }
        self.origin + Duration::from_secs_f64(seconds)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually driven clock
///
/// Clones share the same reading, so a test can hold one handle and
/// advance time underneath a metronome that owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Create a clock reading `start` seconds
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Jump to an absolute reading; earlier readings are ignored
    pub fn set(&self, seconds: f64) {
        if seconds > self.now.get() {
            self.now.set(seconds);
        }
    }

    /// Move the clock forward
    pub fn advance(&self, seconds: f64) {
        self.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

