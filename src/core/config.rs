//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for a worker pool.
//!
//! Config is used in three ways:
//! 1. **Pool creation**: `PoolBuilder::new(config)`
//! 2. **Dispatcher behavior**: backpressure policy and retry backoff
//! 3. **WorkerSpec defaults**: `WorkerSpec::with_defaults(worker, &config)`
//!
//! ## Sentinel values
//! - `reply_timeout = 0s` → callers wait for replies without deadline
//! - `grace = 0s` → shutdown does not wait for workers to stop

use std::time::Duration;

use crate::policies::{BackoffPolicy, BackpressurePolicy};

/// Global configuration for a worker pool.
///
/// ## Field semantics
/// - `grace`: Maximum wait for workers to stop on shutdown
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `inbox_capacity`: Default bounded inbox size per worker (min 1)
/// - `reply_timeout`: Caller-side deadline used by `Pool::request` (`0s` = none)
/// - `backpressure`: What dispatch does when an inbox is full
/// - `backoff`: Delays between retries against a full inbox
/// - `evict_on_stop`: Also prune handles when a `WorkerStopped` event is seen
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for workers to exit during shutdown.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default capacity of a worker inbox.
    ///
    /// Overridable per worker through [`WorkerSpec`](crate::WorkerSpec).
    pub inbox_capacity: usize,

    /// Caller-side timeout for a full request round trip.
    ///
    /// A timeout says nothing about the worker's health; the dispatcher never
    /// learns from it.
    pub reply_timeout: Duration,

    /// Policy for submissions into a full inbox.
    pub backpressure: BackpressurePolicy,

    /// Backoff between retries under [`BackpressurePolicy::Retry`].
    pub backoff: BackoffPolicy,

    /// Prune a worker's handle as soon as its `WorkerStopped` event is observed,
    /// instead of waiting for the next failed submission.
    pub evict_on_stop: bool,
}

impl Config {
    /// Returns the reply timeout as an `Option` (`None` = no deadline).
    #[inline]
    pub fn reply_timeout(&self) -> Option<Duration> {
        if self.reply_timeout.is_zero() {
            None
        } else {
            Some(self.reply_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns an inbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn inbox_capacity_clamped(&self) -> usize {
        self.inbox_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `inbox_capacity = 10`
    /// - `reply_timeout = 5s`
    /// - `backpressure = Retry { attempts: 3 }`
    /// - `backoff = BackoffPolicy::default()`
    /// - `evict_on_stop = false` (failures are discovered on submission)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            inbox_capacity: 10,
            reply_timeout: Duration::from_secs(5),
            backpressure: BackpressurePolicy::default(),
            backoff: BackoffPolicy::default(),
            evict_on_stop: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none_and_minimums() {
        let cfg = Config {
            reply_timeout: Duration::ZERO,
            bus_capacity: 0,
            inbox_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.reply_timeout(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.inbox_capacity_clamped(), 1);
    }

    #[test]
    fn defaults_match_console_behavior() {
        let cfg = Config::default();
        assert_eq!(cfg.reply_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.inbox_capacity, 10);
        assert_eq!(cfg.backpressure, BackpressurePolicy::Retry { attempts: 3 });
    }
}
