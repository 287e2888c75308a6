//! Virtual tick clock.
//!
//! The [`TickClock`] tracks simulation time in minutes independently of
//! wall-clock time. It advances by a fixed step, so every run visits the same
//! tick sequence `0, step, 2*step, ...` up to (but excluding) the horizon.

use serde::{Deserialize, Serialize};

/// Fixed-step simulation clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickClock {
    /// Current simulation minute.
    now_minute: u64,
    /// Minutes per tick.
    step_minutes: u64,
    /// First minute that is no longer simulated.
    horizon_minutes: u64,
}

impl TickClock {
    /// Create a clock at minute zero.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `step_minutes` is zero; config validation
    /// rejects that before a clock is ever built.
    pub fn new(step_minutes: u64, horizon_minutes: u64) -> Self {
        debug_assert!(step_minutes > 0, "tick step must be > 0");
        Self {
            now_minute: 0,
            step_minutes,
            horizon_minutes,
        }
    }

    /// Current minute.
    pub fn now(&self) -> u64 {
        self.now_minute
    }

    /// Whether the current minute is past the simulated horizon.
    pub fn is_exhausted(&self) -> bool {
        self.now_minute >= self.horizon_minutes
    }

    /// Move to the next tick.
    pub fn advance(&mut self) {
        let next = self.now_minute + self.step_minutes;
        debug_assert!(next > self.now_minute, "Cannot move clock backwards");
        self.now_minute = next;
    }

    /// Number of ticks between zero and the horizon.
    pub fn ticks_total(&self) -> u64 {
        self.horizon_minutes.div_ceil(self.step_minutes.max(1))
    }
}
