//! # Backoff between submissions into a full worker inbox.
//!
//! When [`BackpressurePolicy::Retry`](crate::BackpressurePolicy::Retry) finds a
//! worker inbox full, the dispatcher sleeps `backoff.next(n)` before the `n`-th
//! retry against the same handle.
//!
//! The delay for retry `n` is `first × factor^n`, clamped to `max`, then jittered.
//! The base is derived from `n` alone, so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(20),
//!     max: Duration::from_millis(150),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(20));
//! assert_eq!(backoff.next(2), Duration::from_millis(80));
//! assert_eq!(backoff.next(3), Duration::from_millis(150));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy for saturated inboxes.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 50ms`, `factor = 2.0`, `max = 1s`, equal jitter.
    ///
    /// Short on purpose: the dispatcher holds its rotation lock while it waits.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(50),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// A fixed delay with no growth and no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay before retry number `retry` (0-indexed).
    pub fn next(&self, retry: u32) -> Duration {
        let base = self.base(retry);
        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            other => other.apply(base),
        }
    }

    /// `first × factor^retry` clamped to `max`; non-finite or negative results clamp to `max`.
    fn base(&self, retry: u32) -> Duration {
        let exp = retry.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        }
    }
}
