//! # Reconnect bookkeeping.
//!
//! [`ReconnectPolicy`] is the per-session counter that decides whether another
//! automatic reconnect is allowed and how long to wait for it.
//!
//! ```text
//! new/reset:   attempt = 0, current_delay = base
//! advance():   wait = current_delay
//!              attempt += 1
//!              current_delay = min(base × factor^attempt, max)
//! can_retry(): attempt < max_attempts
//! ```
//!
//! Owned and mutated only by the session driver.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Attempt counter plus the delay for the next scheduled reconnect.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    backoff: BackoffPolicy,
    max_attempts: u32,
    attempt: u32,
    current_delay: Duration,
}

impl ReconnectPolicy {
    /// Creates a fresh policy (`attempt = 0`, `current_delay = base`).
    pub fn new(backoff: BackoffPolicy, max_attempts: u32) -> Self {
        Self {
            current_delay: backoff.delay_for(0),
            backoff,
            max_attempts,
            attempt: 0,
        }
    }

    /// Number of automatic reconnects scheduled since the last success.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay the next scheduled reconnect will wait.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Configured cap on automatic reconnects.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// True while another automatic reconnect may be scheduled.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Consumes one attempt and returns how long to wait before it.
    ///
    /// Returns `None` once attempts are exhausted (the counter is left untouched).
    pub fn advance(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }
        let wait = self.current_delay;
        self.attempt += 1;
        self.current_delay = self.backoff.delay_for(self.attempt);
        Some(wait)
    }

    /// Back to `attempt = 0, current_delay = base`.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.current_delay = self.backoff.delay_for(0);
    }
}
