//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher`, `WorkerManager`, `WorkerActor`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener (fans out to `SubscriberSet`,
//!   which includes the `AliveTracker`), the manager's cleanup listener and,
//!   when enabled, `Dispatcher::watch`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
