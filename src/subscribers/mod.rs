//! # Event subscribers.
//!
//! Everything observable in a pool is published as an [`Event`](crate::Event) on
//! the [`Bus`](crate::Bus). A listener forwards each event to a [`SubscriberSet`],
//! which hands it to every [`Subscribe`] implementation through its own queue.
//!
//! ```text
//! Dispatcher / Manager / WorkerActor ── publish ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                                  ├──► AliveTracker
//!                                                                  ├──► LogWriter (feature "logging")
//!                                                                  └──► user subscribers
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
