use std::time::{Duration, Instant};

/// Rings once `duration` has elapsed since the last reset
#[derive(Clone, Debug)]
pub struct Timer {
    duration: Duration,
    last: Instant,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn ringing(&self) -> bool {
        self.last.elapsed() >= self.duration
    }

    /// Time left before the timer rings, zero if it already does
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.last.elapsed())
    }
}
