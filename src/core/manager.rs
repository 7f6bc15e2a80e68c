//! # WorkerManager: spawns, terminates and drains worker actors.
//!
//! The manager owns one slot per running worker (join handle + termination
//! token). It is independent of the dispatcher: it hands out [`WorkerHandle`]s
//! and whoever receives them decides where they are registered.
//!
//! ## Architecture
//! ```text
//! spawn(spec) ──► mpsc::channel(spec.inbox_capacity)
//!                   ├─► WorkerActor::run(child_token)   (tokio::spawn)
//!                   └─► WorkerHandle { id, tx }         (returned)
//!
//! terminate(selector) ──► take slot ──► cancel ──► join ──► WorkerRemoved
//!                                                     └─ panic → WorkerDead
//!
//! Bus ──► spawn_listener()
//!           └─► WorkerStopped(id) for a slot still held → join ──► WorkerRemoved
//!
//! shutdown() ──► ShutdownRequested ──► runtime_token.cancel()
//!                  └─► join all within cfg.grace
//!                        ├─ ok      → AllStoppedWithin
//!                        └─ timeout → GraceExceeded + RuntimeError (AliveTracker snapshot)
//! ```
//!
//! ## Rules
//! - `terminate` returns only after the actor has exited, so the worker's inbox is
//!   closed and every handle to it reports `Gone`.
//! - Ids are never reused within one manager.
//! - Workers spawned after `shutdown` are stopped and joined before `spawn` returns;
//!   they never occupy a slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use tokio::sync::{RwLock, broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        actor::{ActorExitReason, WorkerActor},
        alive::AliveTracker,
        config::Config,
        handle::{WorkerHandle, WorkerId},
        shutdown,
    },
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    workers::WorkerSpec,
};

/// Which worker [`WorkerManager::terminate`] should stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Any running worker, chosen uniformly at random.
    Random,
    /// The worker with this id.
    Id(WorkerId),
    /// The longest-running worker.
    Oldest,
    /// The most recently spawned worker.
    Newest,
}

struct Slot {
    id: WorkerId,
    name: String,
    join: JoinHandle<ActorExitReason>,
    cancel: CancellationToken,
}

/// Owner of the running worker actors.
pub struct WorkerManager {
    bus: Bus,
    grace: std::time::Duration,
    slots: RwLock<Vec<Slot>>,
    next_id: AtomicU64,
    runtime_token: CancellationToken,
    alive: Arc<AliveTracker>,
}

impl WorkerManager {
    /// Creates a manager publishing on `bus`.
    ///
    /// `alive` should be fed from the same bus (see [`PoolBuilder`](crate::PoolBuilder)),
    /// otherwise [`RuntimeError::GraceExceeded`] reports no stuck workers.
    pub fn new(cfg: &Config, bus: Bus, alive: Arc<AliveTracker>) -> Arc<Self> {
        Arc::new(Self {
            bus,
            grace: cfg.grace,
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            runtime_token: CancellationToken::new(),
            alive,
        })
    }

    /// Spawns a worker actor and returns the handle to its inbox.
    pub async fn spawn<P, R>(&self, spec: WorkerSpec<P, R>) -> WorkerHandle<P, R>
    where
        P: Send + 'static,
        R: Send + 'static,
    {
        let id = WorkerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(spec.inbox_capacity());
        let cancel = self.runtime_token.child_token();
        let name = format!("{id} ({})", spec.worker().name());

        let actor = WorkerActor::new(id, spec.worker().clone(), rx, self.bus.clone());
        self.bus
            .publish(Event::new(EventKind::WorkerSpawned).with_worker(id));
        let join = tokio::spawn(actor.run(cancel.clone()));

        {
            let mut slots = self.slots.write().await;
            if !self.runtime_token.is_cancelled() {
                slots.push(Slot {
                    id,
                    name,
                    join,
                    cancel,
                });
                return WorkerHandle::new(id, tx);
            }
        }

        // shutdown already drained the slots and stopped the cleanup listener
        self.join_and_report(id, join).await;
        WorkerHandle::new(id, tx)
    }

    /// Stops the selected worker and waits for its actor to exit.
    ///
    /// Returns `None` if no running worker matches.
    pub async fn terminate(&self, selector: Selector) -> Option<WorkerId> {
        let slot = {
            let mut slots = self.slots.write().await;
            let idx = pick(&slots, selector)?;
            slots.remove(idx)
        };

        self.bus
            .publish(Event::new(EventKind::WorkerTerminateRequested).with_worker(slot.id));
        slot.cancel.cancel();
        let id = slot.id;
        self.join_and_report(slot.id, slot.join).await;
        Some(id)
    }

    /// Running workers in spawn order, with their display names.
    pub async fn list(&self) -> Vec<(WorkerId, String)> {
        self.slots
            .read()
            .await
            .iter()
            .map(|s| (s.id, s.name.clone()))
            .collect()
    }

    /// Number of running workers.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Returns `true` if no worker is running.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Names of the workers the alive tracker currently sees serving.
    pub async fn alive(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// Token cancelled when the manager shuts down.
    pub fn runtime_token(&self) -> CancellationToken {
        self.runtime_token.clone()
    }

    /// Stops every worker and waits up to the configured grace period.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing the workers still alive at the deadline.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let slots: Vec<Slot> = self.slots.write().await.drain(..).collect();
        let done = async {
            for slot in slots {
                self.join_and_report(slot.id, slot.join).await;
            }
        };

        match tokio::time::timeout(self.grace, done).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_timeout(self.grace),
                );
                Err(RuntimeError::GraceExceeded {
                    grace: self.grace,
                    stuck: self.alive.snapshot().await,
                })
            }
        }
    }

    /// Waits for a termination signal, then runs [`shutdown`](Self::shutdown).
    ///
    /// If signal handlers cannot be installed, shuts down right away.
    pub async fn shutdown_on_signal(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                if let Err(err) = res {
                    tracing::warn!(error = %err, "signal handler registration failed");
                }
            }
            _ = self.runtime_token.cancelled() => {}
        }
        self.shutdown().await
    }

    /// Spawns the listener that reaps workers which stopped on their own
    /// (every handle dropped). Call once.
    pub fn spawn_listener(self: &Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let rt = self.runtime_token.clone();
        let me = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = rt.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) if ev.kind == EventKind::WorkerStopped => {
                            if let Some(id) = ev.worker_id {
                                me.reap(id).await;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(_)) => me.reap_finished().await,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    async fn reap(&self, id: WorkerId) {
        let slot = {
            let mut slots = self.slots.write().await;
            match slots.iter().position(|s| s.id == id) {
                Some(idx) => slots.remove(idx),
                None => return,
            }
        };
        self.join_and_report(slot.id, slot.join).await;
    }

    async fn reap_finished(&self) {
        let finished: Vec<Slot> = {
            let mut slots = self.slots.write().await;
            let (done, running): (Vec<Slot>, Vec<Slot>) =
                slots.drain(..).partition(|s| s.join.is_finished());
            *slots = running;
            done
        };
        for slot in finished {
            self.join_and_report(slot.id, slot.join).await;
        }
    }

    async fn join_and_report(&self, id: WorkerId, join: JoinHandle<ActorExitReason>) {
        if let Err(err) = join.await {
            self.bus.publish(
                Event::new(EventKind::WorkerDead)
                    .with_worker(id)
                    .with_reason(if err.is_panic() {
                        "actor_panic"
                    } else {
                        "actor_cancelled"
                    }),
            );
        }
        self.bus
            .publish(Event::new(EventKind::WorkerRemoved).with_worker(id));
    }
}

fn pick(slots: &[Slot], selector: Selector) -> Option<usize> {
    if slots.is_empty() {
        return None;
    }
    match selector {
        Selector::Random => Some(rand::rng().random_range(0..slots.len())),
        Selector::Id(id) => slots.iter().position(|s| s.id == id),
        Selector::Oldest => Some(0),
        Selector::Newest => Some(slots.len() - 1),
    }
}
