//! # Worker abstractions and specifications.
//!
//! - [`Worker`]: trait for async request handlers
//! - [`WorkerFn`]: closure-backed implementation
//! - [`WorkerRef`]: shared reference (`Arc<dyn Worker<P, R>>`)
//! - [`WorkerSpec`]: handler plus inbox capacity, consumed by the manager

mod spec;
mod worker;
mod worker_fn;

pub use spec::WorkerSpec;
pub use worker::{Worker, WorkerRef};
pub use worker_fn::WorkerFn;
