//! # LogWriter: events as `tracing` records
//!
//! A minimal subscriber that turns each [`Event`] into one `tracing` record.
//! Install any `tracing` subscriber (e.g. `tracing-subscriber`) to see them.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO poolvisor: worker spawned worker="worker-1"
//! INFO poolvisor: worker registered worker="worker-1" pool_size=1
//! DEBUG poolvisor: request dispatched worker="worker-1" tried=1
//! WARN poolvisor: inbox full, retrying worker="worker-2" attempt=1 delay_ms=50
//! WARN poolvisor: worker evicted worker="worker-2" pool_size=1 reason="closed"
//! WARN poolvisor: no worker available tried=0
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "poolvisor";

/// Event writer subscriber.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ShutdownRequested => {
                tracing::info!(target: TARGET, seq = e.seq, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: TARGET, seq = e.seq, "all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::error!(target: TARGET, seq = e.seq, grace_ms = ?e.timeout_ms, "grace exceeded");
            }
            EventKind::WorkerSpawned => {
                tracing::info!(target: TARGET, worker, "worker spawned");
            }
            EventKind::WorkerStarted => {
                tracing::debug!(target: TARGET, worker, "worker started");
            }
            EventKind::WorkerStopped => {
                tracing::info!(target: TARGET, worker, reason, "worker stopped");
            }
            EventKind::WorkerTerminateRequested => {
                tracing::info!(target: TARGET, worker, "worker termination requested");
            }
            EventKind::WorkerRemoved => {
                tracing::debug!(target: TARGET, worker, "worker removed");
            }
            EventKind::WorkerDead => {
                tracing::error!(target: TARGET, worker, reason, "worker died");
            }
            EventKind::ReplyDiscarded => {
                tracing::debug!(target: TARGET, worker, "reply discarded, caller gone");
            }
            EventKind::WorkerRegistered => {
                tracing::info!(target: TARGET, worker, pool_size = ?e.pool_size, "worker registered");
            }
            EventKind::WorkerDeregistered => {
                tracing::info!(target: TARGET, worker, pool_size = ?e.pool_size, reason, "worker deregistered");
            }
            EventKind::WorkerEvicted => {
                tracing::warn!(target: TARGET, worker, pool_size = ?e.pool_size, reason, "worker evicted");
            }
            EventKind::InboxFull => {
                tracing::warn!(
                    target: TARGET,
                    worker,
                    attempt = ?e.attempt,
                    delay_ms = ?e.delay_ms,
                    "inbox full, retrying"
                );
            }
            EventKind::RequestDispatched => {
                tracing::debug!(target: TARGET, worker, tried = ?e.attempt, "request dispatched");
            }
            EventKind::PoolEmpty => {
                tracing::warn!(target: TARGET, tried = ?e.attempt, "no worker available");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: TARGET, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: TARGET, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
