//! # Subscriber trait
//!
//! `Subscribe` is the extension point for plugging event handlers into a pool.
//! Each subscriber is driven by a dedicated task fed by a bounded queue owned by
//! the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they never block the dispatcher,
//!   the workers or other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow, events for that subscriber are **dropped** and reported.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use poolvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Evictions(AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Evictions {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::WorkerEvicted {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "evictions" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated task. Avoid blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
