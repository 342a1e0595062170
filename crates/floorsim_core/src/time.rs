//! Logical simulation clock
//!
//! Time is a plain `f64` in simulated seconds. It only moves forward and
//! only when the scheduler says so; wall-clock time never leaks in.

use tracing::warn;

/// Simulated time in seconds.
pub type SimTime = f64;

/// Simulation time tracker
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: SimTime,
    tick_count: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of frames started so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub(crate) fn begin_tick(&mut self) {
        self.tick_count += 1;
    }

    /// Move the clock to `at`. Going backwards is ignored.
    pub fn advance_to(&mut self, at: SimTime) {
        if at < self.now {
            warn!(now = self.now, requested = at, "clock cannot move backwards");
            return;
        }
        self.now = at;
    }
}
