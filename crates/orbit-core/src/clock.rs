//! Fixed-rate accumulators.
//!
//! The physics tick, the validity sweep and the sampler each run on their own
//! period. A host feeds elapsed wall time in and gets back how many times a
//! callback is due.

use std::time::Duration;

/// Catch-up limit so a long stall (suspended tab, debugger) does not trigger
/// a burst of hundreds of ticks.
pub const DEFAULT_MAX_CATCH_UP: u32 = 8;

#[derive(Debug, Clone)]
pub struct FixedTicker {
    period: Duration,
    accumulated: Duration,
    max_catch_up: u32,
}

impl FixedTicker {
    pub fn new(period: Duration) -> Self {
        Self::with_catch_up(period, DEFAULT_MAX_CATCH_UP)
    }

    pub fn with_catch_up(period: Duration, max_catch_up: u32) -> Self {
        Self {
            period,
            accumulated: Duration::ZERO,
            max_catch_up: max_catch_up.max(1),
        }
    }

    /// Adds `elapsed` and returns how many periods completed. Time beyond the
    /// catch-up limit is dropped.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.period.is_zero() {
            return 0;
        }
        self.accumulated += elapsed;

        let mut fired = 0;
        while self.accumulated >= self.period && fired < self.max_catch_up {
            self.accumulated -= self.period;
            fired += 1;
        }
        if self.accumulated >= self.period {
            self.accumulated = Duration::ZERO;
        }
        fired
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time accumulated towards the next firing.
    pub fn pending(&self) -> Duration {
        self.accumulated
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }
}
