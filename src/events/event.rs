//! # Runtime events emitted by the dispatcher, the worker manager and the workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: spawned, started, stopped, terminated, removed
//! - **Dispatch**: registration, eviction, inbox backpressure, dispatched requests
//! - **Shutdown**: shutdown requested, grace outcome
//! - **Subscriber health**: overflow and panics inside subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker
//! identity, reasons, pool size and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{Event, EventKind, WorkerId};
//!
//! let ev = Event::new(EventKind::InboxFull)
//!     .with_worker(WorkerId::new(3))
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(100));
//!
//! assert_eq!(ev.kind, EventKind::InboxFull);
//! assert_eq!(ev.worker.as_deref(), Some("worker-3"));
//! assert_eq!(ev.delay_ms, Some(100));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::WorkerId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `reason` (subscriber name and panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `reason` (subscriber name and "full"/"closed").
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (explicitly or by an OS signal).
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    // === Worker lifecycle events ===
    /// Worker was created by the manager and its actor spawned.
    ///
    /// Sets `worker`, `worker_id`.
    WorkerSpawned,

    /// Worker actor entered its serve loop.
    ///
    /// Sets `worker`, `worker_id`.
    WorkerStarted,

    /// Worker actor left its serve loop; its inbox is closed.
    ///
    /// Sets `worker`, `worker_id`, `reason` ("terminated" or "inbox_closed").
    WorkerStopped,

    /// Termination of a worker was requested via the manager.
    ///
    /// Sets `worker`, `worker_id`.
    WorkerTerminateRequested,

    /// Worker was removed from the manager (after join).
    ///
    /// Sets `worker`, `worker_id`.
    WorkerRemoved,

    /// Worker actor panicked.
    ///
    /// Sets `worker`, `worker_id`, `reason`.
    WorkerDead,

    /// A handle produced no reply because the caller had already dropped its reply target.
    ///
    /// Sets `worker`, `worker_id`.
    ReplyDiscarded,

    // === Dispatch events ===
    /// Handle was appended to the dispatcher's rotation.
    ///
    /// Sets `worker`, `worker_id`, `pool_size`.
    WorkerRegistered,

    /// Handle was explicitly removed from the rotation (not due to a failed submission).
    ///
    /// Sets `worker`, `worker_id`, `pool_size`, `reason`.
    WorkerDeregistered,

    /// Handle was evicted after a failed submission.
    ///
    /// Sets `worker`, `worker_id`, `pool_size`, `reason` ("closed" or "saturated").
    WorkerEvicted,

    /// Submission found the worker inbox full; a retry is scheduled.
    ///
    /// Sets `worker`, `worker_id`, `attempt`, `delay_ms`.
    InboxFull,

    /// Request was accepted by a worker inbox.
    ///
    /// Sets `worker`, `worker_id`, `attempt` (number of handles tried).
    RequestDispatched,

    /// Dispatch failed because no worker is left.
    ///
    /// Sets `attempt` (number of handles tried, may be 0).
    PoolEmpty,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Display name of the worker (`worker-<id>`), if applicable.
    pub worker: Option<Arc<str>>,
    /// Numeric identity of the worker, if applicable.
    pub worker_id: Option<WorkerId>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Number of handles in the rotation after the event.
    pub pool_size: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            worker_id: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            pool_size: None,
            reason: None,
        }
    }

    /// Attaches worker identity (id and display name).
    #[inline]
    pub fn with_worker(mut self, id: WorkerId) -> Self {
        self.worker = Some(id.to_string().into());
        self.worker_id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches the rotation size.
    #[inline]
    pub fn with_pool_size(mut self, n: usize) -> Self {
        self.pool_size = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerSpawned);
        let b = Event::new(EventKind::WorkerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_saturate_at_u32() {
        let ev = Event::new(EventKind::InboxFull).with_delay(Duration::from_secs(u64::MAX / 1000));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn subscriber_events_are_flagged() {
        assert!(Event::subscriber_overflow("audit", "full").is_subscriber_event());
        assert!(!Event::new(EventKind::PoolEmpty).is_subscriber_event());
    }
}
