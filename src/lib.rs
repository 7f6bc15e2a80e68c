//! # poolvisor
//!
//! **Poolvisor** dispatches requests round-robin over a dynamic pool of async
//! workers and drops workers that have gone away, without losing or duplicating
//! the request that discovered it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── request(payload) ──► Pool
//!                                   │
//! ┌─────────────────────────────────▼─────────────────────────────────┐
//! │  Dispatcher<P, R>                                                 │
//! │  - Rotation [h1, h2, h3] + last-used cursor (one lock)            │
//! │  - BackpressurePolicy (wait / retry with backoff / evict)         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ try_submit       │                  │
//!        ▼                  ▼                  ▼
//!   [inbox w1]         [inbox w2]         [inbox w3]     bounded mpsc
//!        │                  │                  │
//!   WorkerActor        WorkerActor        WorkerActor    spawned / terminated
//!        │                  │                  │          by WorkerManager
//!        └──── respond ─────┴──── oneshot ─────┴────► Reply<R> (caller)
//!
//!   Dispatcher, WorkerManager, WorkerActor ── publish ──► Bus
//!        Bus ──► subscriber listener ──► SubscriberSet ──► AliveTracker, LogWriter, ...
//!        Bus ──► manager cleanup listener
//!        Bus ──► Dispatcher::watch (evict_on_stop)
//! ```
//!
//! ### Dispatch
//! ```text
//! dispatch(payload)
//! lock rotation
//! loop {
//!   ├─► advance cursor (wrapping) ─── empty ──► PoolEmpty
//!   ├─► submit to that handle
//!   │     ├─ Accepted              ──► RequestDispatched, return Reply
//!   │     ├─ Gone (inbox closed)   ──► evict by identity, retry same request
//!   │     └─ Full                  ──► per BackpressurePolicy:
//!   │                                   Wait  → await capacity
//!   │                                   Retry → InboxFull + backoff, then evict
//!   │                                   Evict → evict now
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------|---------------------------------------------|
//! | **Dispatch**      | Round-robin selection with lazy eviction.                 | [`Dispatcher`], [`WorkerHandle`]            |
//! | **Workers**       | Request handlers as traits or closures.                   | [`Worker`], [`WorkerFn`], [`WorkerSpec`]    |
//! | **Lifecycle**     | Spawn, terminate and drain worker actors.                 | [`WorkerManager`], [`Selector`]             |
//! | **Envelope**      | One payload, one reply slot.                              | [`Request`], [`Reply`]                      |
//! | **Policies**      | Full-inbox handling and retry delays.                     | [`BackpressurePolicy`], [`BackoffPolicy`]   |
//! | **Subscriber API**| Hook into dispatch and lifecycle events.                  | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors with stable labels.                          | [`DispatchError`], [`ReplyError`]           |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], which renders events as `tracing` records.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use poolvisor::{Config, PoolBuilder, Selector, Subscribe, WorkerFn, WorkerRef, WorkerSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(poolvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let pool = PoolBuilder::new(cfg.clone())
//!         .with_subscribers(subs)
//!         .build::<String, usize>();
//!
//!     let len: WorkerRef<String, usize> = WorkerFn::arc("len", |s: String| async move { s.len() });
//!     for _ in 0..3 {
//!         pool.spawn_worker(WorkerSpec::with_defaults(len.clone(), &cfg)).await;
//!     }
//!
//!     pool.terminate(Selector::Random).await;
//!     assert_eq!(pool.request("hello".to_string()).await?, 5);
//!
//!     pool.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod envelope;
mod error;
mod events;
mod policies;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use self::core::{
    AliveTracker, Config, Dispatcher, Pool, PoolBuilder, Selector, Submission, WorkerHandle,
    WorkerId, WorkerManager,
};
pub use envelope::{Reply, Request, Responder};
pub use error::{DispatchError, ReplyError, RequestError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, BackpressurePolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{Worker, WorkerFn, WorkerRef, WorkerSpec};

// Optional: a built-in subscriber rendering events through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
