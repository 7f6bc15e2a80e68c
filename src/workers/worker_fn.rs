//! # Function-backed worker (`WorkerFn`)
//!
//! [`WorkerFn`] wraps a closure `F: Fn(P) -> Fut`, producing a fresh future per
//! request. Shared state between requests must be captured explicitly
//! (e.g. an `Arc<...>` moved into the closure).
//!
//! ## Example
//! ```rust
//! use poolvisor::{WorkerFn, WorkerRef};
//!
//! let doubler: WorkerRef<u64, u64> = WorkerFn::arc("doubler", |n: u64| async move { n * 2 });
//! assert_eq!(doubler.name(), "doubler");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::workers::worker::Worker;

/// Function-backed worker implementation.
#[derive(Debug)]
pub struct WorkerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkerFn<F> {
    /// Creates a new function-backed worker.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the worker and returns it behind an `Arc`, ready to coerce into a
    /// [`WorkerRef`](crate::WorkerRef).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<P, R, F, Fut> Worker<P, R> for WorkerFn<F>
where
    P: Send + 'static,
    R: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, payload: P) -> R {
        (self.f)(payload).await
    }
}
