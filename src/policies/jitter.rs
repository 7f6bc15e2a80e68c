//! # Jitter for inbox retry delays.
//!
//! Concurrent callers that hit the same saturated worker would otherwise retry
//! in lockstep. [`JitterPolicy`] spreads their retries out.
//!
//! - [`JitterPolicy::None`]: exact delay
//! - [`JitterPolicy::Full`]: uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`]: `delay/2 + uniform[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`]: uniform in `[floor, min(prev × 3, max)]`

use rand::Rng;
use std::time::Duration;

/// Randomization strategy applied on top of a backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the delay unchanged.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Half the delay plus uniform in `[0, delay/2]`.
    Equal,
    /// Uniform between a floor and three times the previous delay, capped.
    ///
    /// Needs extra context, see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay`.
    ///
    /// `Decorrelated` returns the input unchanged here.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let extra = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + extra)
            }
        }
    }

    /// Decorrelated jitter: uniform in `[floor, min(prev × 3, max)]`.
    ///
    /// Other policies fall back to [`apply`](Self::apply) on `prev`.
    pub fn apply_decorrelated(&self, floor: Duration, prev: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(prev);
        }

        let floor_ms = floor.as_millis() as u64;
        let upper = (prev.as_millis() as u64)
            .saturating_mul(3)
            .min(max.as_millis() as u64)
            .max(floor_ms);

        if floor_ms >= upper {
            return floor;
        }
        Duration::from_millis(rand::rng().random_range(floor_ms..=upper))
    }
}
