//! Progress throttling.
//!
//! Rate-limits per-node progress events so fast transfers do not flood
//! observers.

use std::time::{Duration, Instant};

/// Rate-limiter for progress updates of one transfer.
///
/// The first update and the final one (`current >= total`) always pass;
/// in between, updates closer than the interval are dropped.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a new throttle with the specified minimum interval.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Check whether this update should be published.
    pub fn should_emit(&mut self, current: u64, total: u64) -> bool {
        let now = Instant::now();
        let complete = total > 0 && current >= total;
        match self.last_emit {
            Some(last) if !complete && now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Start over for a new transfer.
    pub const fn reset(&mut self) {
        self.last_emit = None;
    }
}
