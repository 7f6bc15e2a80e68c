//! Runtime core: selection, worker lifecycle and assembly.
//!
//! - [`dispatcher`]: round-robin selection with eviction of unreachable workers;
//! - [`rotation`]: ordered members plus the last-used cursor;
//! - [`handle`]: worker identity and the inbox sender with its submission outcome;
//! - [`actor`]: per-worker serve loop;
//! - [`manager`]: spawns, terminates and drains worker actors;
//! - [`alive`]: sequence-ordered liveness tracking;
//! - [`shutdown`]: OS signal handling;
//! - [`builder`]: wires everything into a [`Pool`].

mod actor;
mod alive;
mod builder;
mod config;
mod dispatcher;
mod handle;
mod manager;
mod rotation;
mod shutdown;

pub use alive::AliveTracker;
pub use builder::{Pool, PoolBuilder};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use handle::{Submission, WorkerHandle, WorkerId};
pub use manager::{Selector, WorkerManager};
