//! # Dispatcher: round-robin selection with eviction of unreachable workers.
//!
//! The [`Dispatcher`] owns an ordered rotation of [`WorkerHandle`]s and a cursor
//! on the last used one. Every dispatch runs the following loop under a single
//! lock, so concurrent dispatches, registrations and evictions never interleave:
//!
//! ```text
//! dispatch(payload)
//!   ├─► Request::new(payload) → (request, reply)
//!   └─► lock rotation
//!        loop {
//!          SELECT  advance cursor (wrapping) ── empty? ──► PoolEmpty
//!          SUBMIT  per BackpressurePolicy:
//!                    Accepted            ──► RequestDispatched, return reply
//!                    Gone / Saturated    ──► EVICT that handle (by identity),
//!                                            take the request back, loop
//!        }
//! ```
//!
//! ## Rules
//! - A request reaches **at most one** inbox: a failed submission hands it back untouched.
//! - Eviction matches the failed handle by identity, never by position.
//! - After an eviction, the handle that followed the evicted one is tried next.
//! - A reply that never arrives does not evict anything; callers bound their wait
//!   with [`Reply::recv_timeout`](crate::Reply::recv_timeout).
//!
//! ## Example
//! ```rust
//! use poolvisor::{Bus, Config, Dispatcher, DispatchError, Request, WorkerHandle, WorkerId};
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::<u32, u32>::new(&Config::default(), Bus::new(16));
//! assert_eq!(dispatcher.dispatch(1).await.err(), Some(DispatchError::PoolEmpty));
//!
//! let (tx, mut inbox) = mpsc::channel::<Request<u32, u32>>(4);
//! dispatcher.register(WorkerHandle::new(WorkerId::new(1), tx)).await;
//!
//! let reply = dispatcher.dispatch(20).await.expect("one worker registered");
//! let req = inbox.recv().await.expect("request delivered");
//! let doubled = *req.payload() * 2;
//! req.respond(doubled).expect("caller waiting");
//! assert_eq!(reply.recv().await, Ok(40));
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    core::config::Config,
    core::handle::{Submission, WorkerHandle, WorkerId},
    core::rotation::Rotation,
    envelope::{Reply, Request},
    error::DispatchError,
    events::{Bus, Event, EventKind},
    policies::{BackoffPolicy, BackpressurePolicy},
};

/// Why a handle was taken out of the rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EvictCause {
    /// The inbox was closed: the worker is gone.
    Closed,
    /// The inbox stayed full past the backpressure policy.
    Saturated,
}

impl EvictCause {
    fn as_reason(self) -> &'static str {
        match self {
            EvictCause::Closed => "closed",
            EvictCause::Saturated => "saturated",
        }
    }
}

/// Round-robin dispatcher over a dynamic set of worker handles.
///
/// Generic over the request payload `P` and the response `R`.
pub struct Dispatcher<P, R> {
    rotation: Mutex<Rotation<WorkerHandle<P, R>>>,
    backpressure: BackpressurePolicy,
    backoff: BackoffPolicy,
    bus: Bus,
}

impl<P, R> Dispatcher<P, R> {
    /// Creates an empty dispatcher using the submission policies from `cfg`.
    pub fn new(cfg: &Config, bus: Bus) -> Self {
        Self {
            rotation: Mutex::new(Rotation::new()),
            backpressure: cfg.backpressure,
            backoff: cfg.backoff,
            bus,
        }
    }

    /// Appends `handle` to the end of the rotation.
    ///
    /// Handles are not deduplicated; registering the same handle twice gives
    /// that worker two turns per cycle.
    pub async fn register(&self, handle: WorkerHandle<P, R>) {
        let id = handle.id();
        let size = {
            let mut rotation = self.rotation.lock().await;
            rotation.push(handle);
            rotation.len()
        };
        self.bus.publish(
            Event::new(EventKind::WorkerRegistered)
                .with_worker(id)
                .with_pool_size(size),
        );
    }

    /// Forwards `payload` to the next live worker and returns the reply slot.
    ///
    /// Handles that turn out to be gone (or saturated past the backpressure
    /// policy) are evicted and the next one is tried with the same request.
    ///
    /// # Blocking
    /// The rotation lock is held for the whole call, including backoff sleeps
    /// under [`BackpressurePolicy::Retry`] (about 350ms per saturated handle with
    /// the default backoff) and the wait for capacity under
    /// [`BackpressurePolicy::Wait`]. Concurrent dispatches queue behind it.
    ///
    /// # Errors
    /// [`DispatchError::PoolEmpty`] when no handle is left; the request is dropped.
    pub async fn dispatch(&self, payload: P) -> Result<Reply<R>, DispatchError> {
        let (mut request, reply) = Request::new(payload);
        let mut tried: u32 = 0;

        let mut rotation = self.rotation.lock().await;
        loop {
            let Some(handle) = rotation.advance().cloned() else {
                self.bus
                    .publish(Event::new(EventKind::PoolEmpty).with_attempt(tried));
                return Err(DispatchError::PoolEmpty);
            };
            tried += 1;

            match self.submit(&handle, request).await {
                Ok(()) => {
                    self.bus.publish(
                        Event::new(EventKind::RequestDispatched)
                            .with_worker(handle.id())
                            .with_attempt(tried),
                    );
                    return Ok(reply);
                }
                Err((cause, returned)) => {
                    request = returned;
                    rotation.remove_first(|h| h.id() == handle.id() && h.same_inbox(&handle));
                    self.bus.publish(
                        Event::new(EventKind::WorkerEvicted)
                            .with_worker(handle.id())
                            .with_pool_size(rotation.len())
                            .with_reason(cause.as_reason()),
                    );
                }
            }
        }
    }

    /// Removes the worker `id` from the rotation. Returns `false` if it was not there.
    pub async fn deregister(&self, id: WorkerId) -> bool {
        self.deregister_with_reason(id, "explicit").await
    }

    /// Evicts every handle whose inbox is already closed. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        let (removed, size) = {
            let mut rotation = self.rotation.lock().await;
            let removed = rotation.remove_all(|h| h.is_closed());
            (removed, rotation.len())
        };
        for handle in &removed {
            self.bus.publish(
                Event::new(EventKind::WorkerEvicted)
                    .with_worker(handle.id())
                    .with_pool_size(size)
                    .with_reason(EvictCause::Closed.as_reason()),
            );
        }
        removed.len()
    }

    /// Worker ids in rotation order.
    pub async fn workers(&self) -> Vec<WorkerId> {
        self.rotation.lock().await.iter().map(|h| h.id()).collect()
    }

    /// Number of handles in the rotation.
    pub async fn len(&self) -> usize {
        self.rotation.lock().await.len()
    }

    /// Returns `true` if no handle is registered.
    pub async fn is_empty(&self) -> bool {
        self.rotation.lock().await.is_empty()
    }

    async fn deregister_with_reason(&self, id: WorkerId, reason: &'static str) -> bool {
        let (removed, size) = {
            let mut rotation = self.rotation.lock().await;
            let removed = rotation.remove_first(|h| h.id() == id);
            (removed, rotation.len())
        };
        if removed.is_none() {
            return false;
        }
        self.bus.publish(
            Event::new(EventKind::WorkerDeregistered)
                .with_worker(id)
                .with_pool_size(size)
                .with_reason(reason),
        );
        true
    }

    /// One submission to one handle, applying the backpressure policy.
    ///
    /// On failure the request comes back so the caller can try another handle.
    async fn submit(
        &self,
        handle: &WorkerHandle<P, R>,
        request: Request<P, R>,
    ) -> Result<(), (EvictCause, Request<P, R>)> {
        let Some(retries) = self.backpressure.retries() else {
            return match handle.submit(request).await {
                Submission::Accepted => Ok(()),
                Submission::Gone(req) => Err((EvictCause::Closed, req)),
                Submission::Full(req) => Err((EvictCause::Saturated, req)),
            };
        };

        let mut request = request;
        let mut retry: u32 = 0;
        loop {
            match handle.try_submit(request) {
                Submission::Accepted => return Ok(()),
                Submission::Gone(req) => return Err((EvictCause::Closed, req)),
                Submission::Full(req) if retry >= retries => {
                    return Err((EvictCause::Saturated, req));
                }
                Submission::Full(req) => {
                    let delay = self.backoff.next(retry);
                    retry += 1;
                    self.bus.publish(
                        Event::new(EventKind::InboxFull)
                            .with_worker(handle.id())
                            .with_attempt(retry)
                            .with_delay(delay),
                    );
                    tokio::time::sleep(delay).await;
                    request = req;
                }
            }
        }
    }
}

impl<P, R> Dispatcher<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Spawns a listener that removes a worker's handle as soon as its
    /// [`EventKind::WorkerStopped`] event is published.
    ///
    /// Optional: failed submissions are still detected and evicted without it.
    /// When the listener lags behind the bus it falls back to [`prune`](Self::prune).
    pub fn watch(self: Arc<Self>, token: CancellationToken) {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) if ev.kind == EventKind::WorkerStopped => {
                            if let Some(id) = ev.worker_id {
                                self.deregister_with_reason(id, "stopped").await;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(_)) => {
                            self.prune().await;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::{broadcast, mpsc};

    type Inbox = mpsc::Receiver<Request<u32, u32>>;

    fn worker(id: u64, capacity: usize) -> (WorkerHandle<u32, u32>, Inbox) {
        let (tx, rx) = mpsc::channel(capacity);
        (WorkerHandle::new(WorkerId::new(id), tx), rx)
    }

    fn dispatcher(backpressure: BackpressurePolicy) -> (Dispatcher<u32, u32>, Bus) {
        let cfg = Config {
            backpressure,
            backoff: BackoffPolicy::constant(Duration::from_millis(50)),
            ..Config::default()
        };
        let bus = Bus::new(256);
        (Dispatcher::new(&cfg, bus.clone()), bus)
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn ids(raw: &[u64]) -> Vec<WorkerId> {
        raw.iter().copied().map(WorkerId::new).collect()
    }

    #[tokio::test]
    async fn rotates_in_registration_order_and_wraps() {
        let (d, _bus) = dispatcher(BackpressurePolicy::default());
        let (a, mut rx_a) = worker(1, 4);
        let (b, mut rx_b) = worker(2, 4);
        let (c, mut rx_c) = worker(3, 4);
        d.register(a).await;
        d.register(b).await;
        d.register(c).await;

        for payload in 0..4 {
            d.dispatch(payload).await.expect("dispatched");
        }

        assert_eq!(*rx_a.try_recv().expect("A first").payload(), 0);
        assert_eq!(*rx_b.try_recv().expect("B second").payload(), 1);
        assert_eq!(*rx_c.try_recv().expect("C third").payload(), 2);
        assert_eq!(*rx_a.try_recv().expect("wraps to A").payload(), 3);
        assert!(rx_b.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_pool_fails_immediately() {
        let (d, bus) = dispatcher(BackpressurePolicy::Wait);
        let mut events = bus.subscribe();

        assert_eq!(d.dispatch(1).await.err(), Some(DispatchError::PoolEmpty));

        let evs = drain(&mut events);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].kind, EventKind::PoolEmpty);
        assert_eq!(evs[0].attempt, Some(0));
    }

    #[tokio::test]
    async fn dead_worker_is_evicted_and_request_goes_to_next() {
        let (d, bus) = dispatcher(BackpressurePolicy::default());
        let mut events = bus.subscribe();
        let (a, rx_a) = worker(1, 4);
        let (b, mut rx_b) = worker(2, 4);
        d.register(a).await;
        d.register(b).await;
        drop(rx_a);

        let reply = d.dispatch(7).await.expect("B accepts");
        let req = rx_b.try_recv().expect("delivered to B");
        assert_eq!(*req.payload(), 7);
        req.respond(70).expect("caller waiting");
        assert_eq!(reply.recv().await, Ok(70));

        assert_eq!(d.workers().await, ids(&[2]));

        let evicted: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| e.kind == EventKind::WorkerEvicted)
            .collect();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].worker_id, Some(WorkerId::new(1)));
        assert_eq!(evicted[0].reason.as_deref(), Some("closed"));
        assert_eq!(evicted[0].pool_size, Some(1));

        for payload in 10..13 {
            d.dispatch(payload).await.expect("B keeps serving");
            assert_eq!(*rx_b.try_recv().expect("only B").payload(), payload);
        }
    }

    #[tokio::test]
    async fn single_dead_worker_empties_the_pool() {
        let (d, _bus) = dispatcher(BackpressurePolicy::default());
        let (a, rx_a) = worker(1, 4);
        d.register(a).await;
        drop(rx_a);

        assert_eq!(d.dispatch(1).await.err(), Some(DispatchError::PoolEmpty));
        assert!(d.is_empty().await);
    }

    #[tokio::test]
    async fn all_dead_workers_exhaust_without_hanging() {
        let (d, _bus) = dispatcher(BackpressurePolicy::Wait);
        for id in 1..=5 {
            let (h, rx) = worker(id, 1);
            drop(rx);
            d.register(h).await;
        }

        let res = tokio::time::timeout(Duration::from_secs(1), d.dispatch(1))
            .await
            .expect("dispatch must not hang");
        assert_eq!(res.err(), Some(DispatchError::PoolEmpty));
        assert_eq!(d.len().await, 0);
    }

    #[tokio::test]
    async fn eviction_keeps_order_and_cursor_of_survivors() {
        let (d, _bus) = dispatcher(BackpressurePolicy::default());
        let (a, mut rx_a) = worker(1, 8);
        let (b, rx_b) = worker(2, 8);
        let (c, mut rx_c) = worker(3, 8);
        let (e, mut rx_e) = worker(4, 8);
        for h in [a, b, c, e] {
            d.register(h).await;
        }

        d.dispatch(0).await.expect("A");
        drop(rx_b);
        // B is next: evicted, then C takes the request.
        d.dispatch(1).await.expect("C");
        d.dispatch(2).await.expect("D");
        d.dispatch(3).await.expect("A again");

        assert_eq!(d.workers().await, ids(&[1, 3, 4]));
        assert_eq!(*rx_a.try_recv().expect("A").payload(), 0);
        assert_eq!(*rx_c.try_recv().expect("C").payload(), 1);
        assert_eq!(*rx_e.try_recv().expect("D").payload(), 2);
        assert_eq!(*rx_a.try_recv().expect("A").payload(), 3);
    }

    #[tokio::test]
    async fn evict_policy_treats_full_inbox_as_gone() {
        let (d, bus) = dispatcher(BackpressurePolicy::Evict);
        let mut events = bus.subscribe();
        let (a, mut rx_a) = worker(1, 1);
        let (b, mut rx_b) = worker(2, 1);
        let (filler, _r) = Request::new(99);
        assert!(matches!(a.try_submit(filler), Submission::Accepted));
        d.register(a).await;
        d.register(b).await;

        d.dispatch(5).await.expect("B accepts");
        assert_eq!(*rx_b.try_recv().expect("B").payload(), 5);
        assert_eq!(*rx_a.try_recv().expect("filler only").payload(), 99);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(d.workers().await, ids(&[2]));

        let reasons: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| e.kind == EventKind::WorkerEvicted)
            .filter_map(|e| e.reason)
            .collect();
        assert_eq!(reasons.len(), 1);
        assert_eq!(&*reasons[0], "saturated");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_waits_out_a_busy_worker() {
        let (d, bus) = dispatcher(BackpressurePolicy::Retry { attempts: 3 });
        let mut events = bus.subscribe();
        let (a, mut rx_a) = worker(1, 1);
        let (b, mut rx_b) = worker(2, 1);
        let (filler, _r) = Request::new(99);
        assert!(matches!(a.try_submit(filler), Submission::Accepted));
        d.register(a).await;
        d.register(b).await;

        let drainer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            let first = rx_a.recv().await.expect("filler");
            let second = rx_a.recv().await.expect("retried request");
            (*first.payload(), *second.payload())
        });

        d.dispatch(5).await.expect("A accepts after draining");
        assert_eq!(drainer.await.expect("drainer"), (99, 5));
        assert!(rx_b.try_recv().is_err());
        assert_eq!(d.workers().await, ids(&[1, 2]));

        let full: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| e.kind == EventKind::InboxFull)
            .collect();
        assert_eq!(full.len(), 2);
        assert_eq!(full[0].delay_ms, Some(50));
        assert_eq!(full[1].attempt, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_evicts_after_exhausting_attempts() {
        let (d, _bus) = dispatcher(BackpressurePolicy::Retry { attempts: 2 });
        let (a, _rx_a) = worker(1, 1);
        let (b, mut rx_b) = worker(2, 1);
        let (filler, _r) = Request::new(99);
        assert!(matches!(a.try_submit(filler), Submission::Accepted));
        d.register(a).await;
        d.register(b).await;

        let started = tokio::time::Instant::now();
        d.dispatch(5).await.expect("B accepts");
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(*rx_b.try_recv().expect("B").payload(), 5);
        assert_eq!(d.workers().await, ids(&[2]));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_policy_blocks_until_capacity() {
        let (d, _bus) = dispatcher(BackpressurePolicy::Wait);
        let (a, mut rx_a) = worker(1, 1);
        let (filler, _r) = Request::new(99);
        assert!(matches!(a.try_submit(filler), Submission::Accepted));
        d.register(a).await;

        let drainer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            let _ = rx_a.recv().await;
            rx_a.recv().await.map(|r| *r.payload())
        });

        d.dispatch(5).await.expect("eventually accepted");
        assert_eq!(drainer.await.expect("drainer"), Some(5));
        assert_eq!(d.len().await, 1);
    }

    #[tokio::test]
    async fn deregister_and_prune_remove_by_identity() {
        let (d, bus) = dispatcher(BackpressurePolicy::default());
        let mut events = bus.subscribe();
        let (a, _rx_a) = worker(1, 1);
        let (b, rx_b) = worker(2, 1);
        let (c, rx_c) = worker(3, 1);
        for h in [a, b, c] {
            d.register(h).await;
        }

        assert!(d.deregister(WorkerId::new(1)).await);
        assert!(!d.deregister(WorkerId::new(1)).await);

        drop(rx_b);
        drop(rx_c);
        assert_eq!(d.prune().await, 2);
        assert!(d.is_empty().await);

        let kinds: Vec<_> = drain(&mut events).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::WorkerDeregistered).count(),
            1
        );
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::WorkerEvicted).count(),
            2
        );
    }

    #[tokio::test]
    async fn watch_prunes_on_worker_stopped() {
        let (d, bus) = dispatcher(BackpressurePolicy::default());
        let d = Arc::new(d);
        let (a, _rx_a) = worker(1, 1);
        let (b, _rx_b) = worker(2, 1);
        d.register(a).await;
        d.register(b).await;

        let token = CancellationToken::new();
        Arc::clone(&d).watch(token.clone());
        tokio::task::yield_now().await;

        bus.publish(Event::new(EventKind::WorkerStopped).with_worker(WorkerId::new(1)));

        tokio::time::timeout(Duration::from_secs(1), async {
            while d.len().await != 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("handle pruned");
        assert_eq!(d.workers().await, ids(&[2]));
        token.cancel();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatches_deliver_each_request_once() {
        let (d, _bus) = dispatcher(BackpressurePolicy::Wait);
        let d = Arc::new(d);
        let mut inboxes = Vec::new();
        for id in 1..=3 {
            let (h, rx) = worker(id, 64);
            d.register(h).await;
            inboxes.push(rx);
        }

        let mut callers = Vec::new();
        for payload in 0..60 {
            let d = Arc::clone(&d);
            callers.push(tokio::spawn(async move { d.dispatch(payload).await.is_ok() }));
        }
        for c in callers {
            assert!(c.await.expect("caller"));
        }

        let mut seen = Vec::new();
        for rx in &mut inboxes {
            let mut per_worker = 0;
            while let Ok(req) = rx.try_recv() {
                seen.push(*req.payload());
                per_worker += 1;
            }
            assert_eq!(per_worker, 20, "rotation spreads evenly");
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..60).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_keeps_live_handles_and_evicts_dead_ones() {
        let (d, bus) = dispatcher(BackpressurePolicy::Wait);
        let d = Arc::new(d);
        let mut events = bus.subscribe();

        let mut inboxes = Vec::new();
        for (id, alive) in [(1, true), (2, false), (3, true), (4, false)] {
            let (h, rx) = worker(id, 256);
            d.register(h).await;
            if alive {
                inboxes.push(rx);
            }
        }

        let mut registrars = Vec::new();
        for id in 11..=14 {
            let d = Arc::clone(&d);
            registrars.push(tokio::spawn(async move {
                let (h, rx) = worker(id, 256);
                d.register(h).await;
                rx
            }));
        }
        let mut callers = Vec::new();
        for task in 0..4u32 {
            let d = Arc::clone(&d);
            callers.push(tokio::spawn(async move {
                for n in 0..25 {
                    d.dispatch(task * 25 + n).await.expect("live workers remain");
                }
            }));
        }

        for r in registrars {
            inboxes.push(r.await.expect("registrar"));
        }
        for c in callers {
            c.await.expect("caller");
        }

        let seen_events = drain(&mut events);
        let mut evicted: Vec<WorkerId> = seen_events
            .iter()
            .filter(|ev| ev.kind == EventKind::WorkerEvicted)
            .filter_map(|ev| ev.worker_id)
            .collect();
        evicted.sort_unstable();
        assert_eq!(evicted, ids(&[2, 4]), "only closed inboxes are evicted");

        let registered: Vec<WorkerId> = seen_events
            .iter()
            .filter(|ev| ev.kind == EventKind::WorkerRegistered)
            .filter_map(|ev| ev.worker_id)
            .filter(|id| ![2, 4].contains(&id.get()))
            .collect();
        assert_eq!(registered.len(), 6);
        assert_eq!(d.workers().await, registered, "live handles keep registration order");

        let mut seen = Vec::new();
        for rx in &mut inboxes {
            while let Ok(req) = rx.try_recv() {
                seen.push(*req.payload());
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }
}
