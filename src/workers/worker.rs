//! # Worker abstraction.
//!
//! A [`Worker`] turns one payload into one response. It knows nothing about
//! inboxes, termination or replies: the runtime's actor loop owns those and
//! calls [`Worker::handle`] once per received request.

use std::sync::Arc;

use async_trait::async_trait;

/// # Asynchronous request handler behind a worker inbox.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use poolvisor::Worker;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Worker<String, String> for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     async fn handle(&self, payload: String) -> String {
///         payload
///     }
/// }
/// ```
#[async_trait]
pub trait Worker<P, R>: Send + Sync + 'static {
    /// Human-readable kind of worker (several workers may share a name).
    fn name(&self) -> &str;

    /// Produces the response for one payload.
    ///
    /// The future is dropped if the worker is terminated while it runs; in that
    /// case no response is written.
    async fn handle(&self, payload: P) -> R;
}

/// Shared handle to a worker implementation.
pub type WorkerRef<P, R> = Arc<dyn Worker<P, R>>;
