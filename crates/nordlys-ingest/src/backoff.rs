//! Exponential backoff for reconnection attempts.

use std::time::Duration;

/// Exponential backoff with a multiplier and a cap, no overall deadline.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            initial,
            multiplier,
            max,
            current: initial,
        }
    }

    /// The delay to sleep before the next attempt. Grows by the multiplier
    /// on every call until the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.multiplier).min(self.max);
        delay
    }

    /// Restart from the initial delay, after a successful connection or a
    /// host switch.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
