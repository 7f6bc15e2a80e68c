//! # Pool assembly.
//!
//! [`PoolBuilder`] wires the runtime pieces together and returns a [`Pool`]:
//!
//! ```text
//! PoolBuilder::new(cfg).with_subscribers(subs).build::<P, R>()
//!   ├─► Bus::new(cfg.bus_capacity)
//!   ├─► SubscriberSet(subs + AliveTracker) ◄── listener ◄── Bus
//!   ├─► WorkerManager (+ cleanup listener)
//!   ├─► Dispatcher<P, R>
//!   └─► Dispatcher::watch, if cfg.evict_on_stop
//! ```
//!
//! [`Pool`] is the usual entry point: spawn workers, send requests, shut down.
//! The dispatcher and the manager stay reachable for finer control.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    core::{
        alive::AliveTracker,
        config::Config,
        dispatcher::Dispatcher,
        handle::WorkerId,
        manager::{Selector, WorkerManager},
    },
    envelope::Reply,
    error::{DispatchError, RequestError, RuntimeError},
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
    workers::WorkerSpec,
};

/// Builder for a [`Pool`].
pub struct PoolBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl PoolBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets its own bounded queue and task.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the pool. Must be called inside a Tokio runtime.
    pub fn build<P, R>(self) -> Pool<P, R>
    where
        P: Send + 'static,
        R: Send + 'static,
    {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let alive = Arc::new(AliveTracker::new());

        let mut subscribers = self.subscribers;
        subscribers.push(alive.clone());
        let subs = SubscriberSet::new(subscribers, bus.clone());
        subscriber_listener(bus.subscribe(), subs);

        let manager = WorkerManager::new(&self.cfg, bus.clone(), alive);
        manager.spawn_listener();

        let dispatcher = Arc::new(Dispatcher::new(&self.cfg, bus.clone()));
        if self.cfg.evict_on_stop {
            Arc::clone(&dispatcher).watch(manager.runtime_token());
        }

        Pool {
            cfg: self.cfg,
            bus,
            manager,
            dispatcher,
        }
    }
}

/// Forwards bus events to the subscriber set until the bus closes.
fn subscriber_listener(mut rx: broadcast::Receiver<Event>, subs: SubscriberSet) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    });
}

/// A dispatcher and the manager feeding it, sharing one event bus.
///
/// ## Example
/// ```rust
/// use poolvisor::{Config, PoolBuilder, WorkerFn, WorkerRef, WorkerSpec};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cfg = Config::default();
/// let pool = PoolBuilder::new(cfg.clone()).build::<u64, u64>();
///
/// let square: WorkerRef<u64, u64> = WorkerFn::arc("square", |n: u64| async move { n * n });
/// pool.spawn_worker(WorkerSpec::with_defaults(square.clone(), &cfg)).await;
/// pool.spawn_worker(WorkerSpec::with_defaults(square, &cfg)).await;
///
/// assert_eq!(pool.request(12).await?, 144);
/// pool.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct Pool<P, R> {
    cfg: Config,
    bus: Bus,
    manager: Arc<WorkerManager>,
    dispatcher: Arc<Dispatcher<P, R>>,
}

impl<P, R> Pool<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Spawns a worker and appends its handle to the rotation.
    pub async fn spawn_worker(&self, spec: WorkerSpec<P, R>) -> WorkerId {
        let handle = self.manager.spawn(spec).await;
        let id = handle.id();
        self.dispatcher.register(handle).await;
        id
    }

    /// Stops a worker. Its handle stays in the rotation until a dispatch finds
    /// it gone (or until `watch` removes it, with `evict_on_stop`).
    pub async fn terminate(&self, selector: Selector) -> Option<WorkerId> {
        self.manager.terminate(selector).await
    }

    /// Sends `payload` to the next live worker. See [`Dispatcher::dispatch`].
    pub async fn dispatch(&self, payload: P) -> Result<Reply<R>, DispatchError> {
        self.dispatcher.dispatch(payload).await
    }

    /// Dispatches `payload` and waits for the answer for at most
    /// [`Config::reply_timeout`] (`0` = no deadline).
    ///
    /// A timeout is only reported to the caller; the worker stays in the rotation.
    pub async fn request(&self, payload: P) -> Result<R, RequestError> {
        let reply = self.dispatcher.dispatch(payload).await?;
        let response = match self.cfg.reply_timeout() {
            Some(timeout) => reply.recv_timeout(timeout).await?,
            None => reply.recv().await?,
        };
        Ok(response)
    }

    /// Worker ids in rotation order.
    pub async fn workers(&self) -> Vec<WorkerId> {
        self.dispatcher.workers().await
    }

    /// Names of the workers currently serving.
    pub async fn alive(&self) -> Vec<String> {
        self.manager.alive().await
    }

    /// Stops every worker within [`Config::grace`].
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.manager.shutdown().await
    }

    /// Waits for a termination signal, then shuts down.
    pub async fn shutdown_on_signal(&self) -> Result<(), RuntimeError> {
        self.manager.shutdown_on_signal().await
    }

    /// The dispatcher behind this pool.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<P, R>> {
        &self.dispatcher
    }

    /// The manager behind this pool.
    pub fn manager(&self) -> &Arc<WorkerManager> {
        &self.manager
    }

    /// Subscribes to the pool's event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Configuration the pool was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        error::ReplyError,
        events::EventKind,
        policies::BackpressurePolicy,
        workers::{WorkerFn, WorkerRef},
    };

    fn tagged(tag: &'static str) -> WorkerRef<u32, String> {
        WorkerFn::arc(tag, move |n: u32| async move { format!("{tag}:{n}") })
    }

    fn pool(cfg: Config) -> Pool<u32, String> {
        PoolBuilder::new(cfg).build()
    }

    #[tokio::test]
    async fn requests_rotate_across_workers() {
        let pool = pool(Config::default());
        for tag in ["a", "b", "c"] {
            pool.spawn_worker(WorkerSpec::new(tagged(tag), 4)).await;
        }

        let mut got = Vec::new();
        for n in 0..4 {
            got.push(pool.request(n).await.expect("served"));
        }
        assert_eq!(got, vec!["a:0", "b:1", "c:2", "a:3"]);
    }

    #[tokio::test]
    async fn terminated_worker_is_skipped_and_evicted() {
        let pool = pool(Config::default());
        let a = pool.spawn_worker(WorkerSpec::new(tagged("a"), 4)).await;
        let b = pool.spawn_worker(WorkerSpec::new(tagged("b"), 4)).await;
        let c = pool.spawn_worker(WorkerSpec::new(tagged("c"), 4)).await;

        assert_eq!(pool.request(0).await.expect("served"), "a:0");
        assert_eq!(pool.terminate(Selector::Id(b)).await, Some(b));

        assert_eq!(pool.request(1).await.expect("served"), "c:1");
        assert_eq!(pool.workers().await, vec![a, c]);
        assert_eq!(pool.request(2).await.expect("served"), "a:2");
    }

    #[tokio::test]
    async fn empty_pool_reports_dispatch_error() {
        let pool = pool(Config::default());
        let err = pool.request(1).await.expect_err("nobody to serve");
        assert_eq!(err.as_label(), "dispatch_pool_empty");

        let only = pool.spawn_worker(WorkerSpec::new(tagged("x"), 1)).await;
        pool.terminate(Selector::Id(only)).await;
        assert!(matches!(
            pool.request(2).await,
            Err(RequestError::Dispatch(DispatchError::PoolEmpty))
        ));
        assert!(pool.workers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reply_timeout_does_not_evict() {
        let cfg = Config {
            reply_timeout: Duration::from_secs(5),
            ..Config::default()
        };
        let pool: Pool<u32, u32> = PoolBuilder::new(cfg).build();
        let slow: WorkerRef<u32, u32> = WorkerFn::arc("slow", |n: u32| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            n
        });
        let id = pool.spawn_worker(WorkerSpec::new(slow, 4)).await;

        assert!(matches!(
            pool.request(1).await,
            Err(RequestError::Reply(ReplyError::Timeout { .. }))
        ));
        assert_eq!(pool.workers().await, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_reply_timeout_waits_for_slow_worker() {
        let cfg = Config {
            reply_timeout: Duration::ZERO,
            ..Config::default()
        };
        let pool: Pool<u32, u32> = PoolBuilder::new(cfg).build();
        let slow: WorkerRef<u32, u32> = WorkerFn::arc("slow", |n: u32| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            n
        });
        pool.spawn_worker(WorkerSpec::new(slow, 4)).await;

        assert_eq!(pool.request(7).await.expect("served"), 7);
    }

    #[tokio::test]
    async fn evict_on_stop_prunes_without_a_dispatch() {
        let cfg = Config {
            evict_on_stop: true,
            backpressure: BackpressurePolicy::Evict,
            ..Config::default()
        };
        let pool = pool(cfg);
        let mut events = pool.subscribe();
        let a = pool.spawn_worker(WorkerSpec::new(tagged("a"), 4)).await;
        let b = pool.spawn_worker(WorkerSpec::new(tagged("b"), 4)).await;

        pool.terminate(Selector::Id(a)).await;
        loop {
            let ev = events.recv().await.expect("bus open");
            if ev.kind == EventKind::WorkerDeregistered && ev.worker_id == Some(a) {
                assert_eq!(ev.reason.as_deref(), Some("stopped"));
                break;
            }
        }
        assert_eq!(pool.workers().await, vec![b]);
    }

    #[tokio::test]
    async fn alive_reflects_running_workers() {
        let pool = pool(Config::default());
        let a = pool.spawn_worker(WorkerSpec::new(tagged("a"), 4)).await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while pool.alive().await.is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "tracker never saw the worker");
            tokio::task::yield_now().await;
        }
        assert_eq!(pool.alive().await, vec![a.to_string()]);
        assert!(pool.shutdown().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocked_worker_exceeds_grace() {
        let cfg = Config {
            grace: Duration::from_millis(20),
            ..Config::default()
        };
        let pool: Pool<u32, u32> = PoolBuilder::new(cfg).build();
        let blocking: WorkerRef<u32, u32> = WorkerFn::arc("blocking", |n: u32| async move {
            std::thread::sleep(Duration::from_millis(300));
            n
        });
        let id = pool.spawn_worker(WorkerSpec::new(blocking, 4)).await;

        while pool.alive().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let _reply = pool.dispatch(1).await.expect("accepted");
        tokio::time::sleep(Duration::from_millis(20)).await;

        match pool.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec![id.to_string()]);
            }
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
    }
}
