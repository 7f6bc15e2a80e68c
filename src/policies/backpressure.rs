//! # What a dispatch does when a worker inbox is full.
//!
//! A closed inbox always means the worker is gone and its handle is evicted.
//! A **full** inbox is ambiguous: the worker may be busy or wedged.
//! [`BackpressurePolicy`] decides how long the dispatcher gives it:
//!
//! ```text
//! Wait               → await capacity; never evicts a live worker
//! Retry { attempts } → retry with backoff, then evict as saturated (default)
//! Evict              → evict immediately
//! ```
//!
//! `Wait` can block dispatch for as long as the worker stays wedged with a full
//! inbox, since all dispatches share one rotation lock.

/// Policy for submissions into a full worker inbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Await free capacity in the inbox.
    Wait,
    /// Retry up to `attempts` times, sleeping per [`BackoffPolicy`](crate::BackoffPolicy)
    /// between tries, then evict the handle.
    Retry {
        /// Number of retries after the first failed try (`0` behaves like `Evict`).
        attempts: u32,
    },
    /// Treat a full inbox exactly like a closed one.
    Evict,
}

impl Default for BackpressurePolicy {
    /// Returns `Retry { attempts: 3 }`.
    fn default() -> Self {
        BackpressurePolicy::Retry { attempts: 3 }
    }
}

impl BackpressurePolicy {
    /// Number of retries allowed against a full inbox, or `None` when the
    /// dispatcher waits for capacity instead.
    pub fn retries(&self) -> Option<u32> {
        match self {
            BackpressurePolicy::Wait => None,
            BackpressurePolicy::Retry { attempts } => Some(*attempts),
            BackpressurePolicy::Evict => Some(0),
        }
    }
}
