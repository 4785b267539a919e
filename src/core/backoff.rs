//! Backoff utility for polling loops that find no work
//!
//! Pull consumers drain their partitions without blocking. When a drain comes
//! back empty the consumer sleeps for an exponentially growing delay, capped at
//! `max`, and starts over from `initial` once work shows up again.

use std::time::Duration;

/// Configurable backoff policy for empty polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(50),
        }
    }
}

impl BackoffPolicy {
    /// Start a fresh delay sequence
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: *self,
            current: self.initial,
        }
    }
}

/// Delay sequence produced by a `BackoffPolicy`
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    /// Return the next delay and double the one after it (up to the cap)
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.policy.max);
        self.current = (self.current * 2).min(self.policy.max);
        delay
    }

    /// Go back to the initial delay
    pub fn reset(&mut self) {
        self.current = self.policy.initial;
    }
}
