//! # Backoff policy for reconnect delays.
//!
//! [`BackoffPolicy`] controls how the wait between reconnect attempts grows.
//! It is parameterized by:
//! - [`BackoffPolicy::base`] the delay before the first reconnect;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the cap.
//!
//! The delay for attempt `n` is `base × factor^n`, clamped to `max`, then jitter
//! is applied. The base value depends only on `n`, so a jittered delay never
//! feeds into the next one.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use shiftlink::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     base: Duration::from_millis(1000),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(0), Duration::from_millis(1000));
//! assert_eq!(backoff.delay_for(1), Duration::from_millis(2000));
//! // 1s × 2^10 = 1024s → capped at 30s
//! assert_eq!(backoff.delay_for(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt.
    pub base: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied on top of the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns `base = 1s`, `factor = 2.0`, `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given attempt number (0-indexed).
    ///
    /// `base × factor^attempt` clamped to [`BackoffPolicy::max`]; non-finite or
    /// negative intermediate values clamp to `max` as well.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped = self.base.as_secs_f64() * self.factor.powi(exp);

        let delay = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        };
        self.jitter.apply(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling(base_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(base_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn attempt_zero_returns_base() {
        assert_eq!(doubling(1000, 30_000).delay_for(0), Duration::from_millis(1000));
    }

    #[test]
    fn exponential_growth_until_cap() {
        let policy = doubling(1000, 30_000);
        let delays: Vec<u64> = (0..7)
            .map(|n| policy.delay_for(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn delays_never_decrease() {
        let policy = doubling(250, 10_000);
        let mut prev = Duration::ZERO;
        for attempt in 0..64 {
            let d = policy.delay_for(attempt);
            assert!(d >= prev, "attempt {attempt}: {d:?} < {prev:?}");
            prev = d;
        }
    }

    #[test]
    fn constant_factor() {
        let policy = BackoffPolicy {
            factor: 1.0,
            ..doubling(500, 30_000)
        };
        for attempt in 0..10 {
            assert_eq!(policy.delay_for(attempt), Duration::from_millis(500));
        }
    }

    #[test]
    fn base_exceeding_max_is_clamped() {
        assert_eq!(doubling(10_000, 5_000).delay_for(0), Duration::from_secs(5));
    }

    #[test]
    fn huge_attempt_clamps_to_max() {
        let policy = doubling(100, 60_000);
        assert_eq!(policy.delay_for(100), Duration::from_secs(60));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn equal_jitter_stays_within_half_and_full() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..doubling(1000, 30_000)
        };
        for attempt in 0..10 {
            let base = doubling(1000, 30_000).delay_for(attempt);
            let d = policy.delay_for(attempt);
            assert!(d >= base / 2 && d <= base, "attempt {attempt}: {d:?}");
        }
    }
}
