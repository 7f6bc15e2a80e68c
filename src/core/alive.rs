//! # Worker liveness tracker with sequence-based ordering.
//!
//! Keeps the authoritative view of which workers are currently serving,
//! using event sequence numbers to survive out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! WorkerActor ──► Bus ──► subscriber listener ──► SubscriberSet ──► AliveTracker::on_event()
//!                                                                          │
//!                                                                          ▼
//!                                                           BTreeMap<WorkerId, WorkerState>
//!                                                                  (id → {seq, alive})
//! ```
//!
//! ## Rules
//! - Only `WorkerStarted` / `WorkerStopped` / `WorkerDead` create an entry and change alive state
//! - Other events for a tracked worker **update seq** but not the state
//! - `WorkerRemoved` (the manager's last event for a worker) drops the entry
//! - Events with `seq <= last_seq` are **rejected** (stale)

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    core::handle::WorkerId,
    events::{Event, EventKind},
    subscribers::Subscribe,
};

#[derive(Debug, Clone, Copy)]
struct WorkerState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of alive workers.
///
/// Used by the manager to name the workers that did not stop within the
/// shutdown grace period.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<BTreeMap<WorkerId, WorkerState>>,
}

impl AliveTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its worker.
    ///
    /// ```text
    /// update(WorkerStopped, seq=100) → alive=false, last_seq=100
    /// update(WorkerStarted, seq=99)  → rejected (stale)
    /// ```
    ///
    /// Returns `true` if the alive state was written.
    pub async fn update(&self, ev: &Event) -> bool {
        let Some(id) = ev.worker_id else {
            return false;
        };

        let mut state = self.state.write().await;
        if ev.kind == EventKind::WorkerRemoved {
            return state.remove(&id).is_some();
        }

        let entry = match ev.kind {
            EventKind::WorkerStarted | EventKind::WorkerStopped | EventKind::WorkerDead => {
                state.entry(id).or_insert(WorkerState {
                    last_seq: 0,
                    alive: false,
                })
            }
            _ => match state.get_mut(&id) {
                Some(entry) => entry,
                None => return false,
            },
        };
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        match ev.kind {
            EventKind::WorkerStarted => {
                entry.alive = true;
                true
            }
            EventKind::WorkerStopped | EventKind::WorkerDead => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Names of the workers currently alive, in id order.
    pub async fn snapshot(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .iter()
            .filter(|(_, ws)| ws.alive)
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Returns `true` if worker `id` is currently alive.
    pub async fn is_alive(&self, id: WorkerId) -> bool {
        self.state
            .read()
            .await
            .get(&id)
            .is_some_and(|ws| ws.alive)
    }
}

#[async_trait]
impl Subscribe for AliveTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "alive_tracker"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, id: u64) -> Event {
        Event::new(kind).with_worker(WorkerId::new(id))
    }

    #[tokio::test]
    async fn tracks_start_and_stop() {
        let tracker = AliveTracker::new();
        assert!(tracker.update(&ev(EventKind::WorkerStarted, 2)).await);
        assert!(tracker.update(&ev(EventKind::WorkerStarted, 1)).await);
        assert_eq!(tracker.snapshot().await, vec!["worker-1", "worker-2"]);

        assert!(tracker.update(&ev(EventKind::WorkerStopped, 2)).await);
        assert!(!tracker.is_alive(WorkerId::new(2)).await);
        assert_eq!(tracker.snapshot().await, vec!["worker-1"]);
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let started = ev(EventKind::WorkerStarted, 7);
        let stopped = ev(EventKind::WorkerStopped, 7);

        assert!(tracker.update(&stopped).await);
        assert!(!tracker.update(&started).await);
        assert!(!tracker.is_alive(WorkerId::new(7)).await);
    }

    #[tokio::test]
    async fn removed_workers_are_forgotten() {
        let tracker = AliveTracker::new();
        for id in 1..=1000 {
            tracker.update(&ev(EventKind::WorkerSpawned, id)).await;
            tracker.update(&ev(EventKind::WorkerStarted, id)).await;
            tracker.update(&ev(EventKind::WorkerStopped, id)).await;
            tracker.update(&ev(EventKind::WorkerRemoved, id)).await;
        }
        tracker.update(&ev(EventKind::WorkerStarted, 1001)).await;

        assert_eq!(tracker.state.read().await.len(), 1);
        assert_eq!(tracker.snapshot().await, vec!["worker-1001"]);
    }

    #[tokio::test]
    async fn dispatch_events_do_not_create_entries() {
        let tracker = AliveTracker::new();
        assert!(!tracker.update(&ev(EventKind::RequestDispatched, 3)).await);
        assert!(!tracker.update(&ev(EventKind::WorkerEvicted, 3)).await);
        assert!(tracker.state.read().await.is_empty());
    }

    #[tokio::test]
    async fn events_without_worker_are_ignored() {
        let tracker = AliveTracker::new();
        assert!(!tracker.update(&Event::new(EventKind::ShutdownRequested)).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
