//! # Worker specification.
//!
//! [`WorkerSpec`] describes how the manager should run one worker: the handler
//! and the capacity of its bounded inbox.
//!
//! A spec can be created:
//! - **Explicitly** with [`WorkerSpec::new`]
//! - **From config** with [`WorkerSpec::with_defaults`] (inherits `inbox_capacity`)

use crate::{core::Config, workers::WorkerRef};

/// Specification for spawning one worker.
///
/// ## Example
/// ```rust
/// use poolvisor::{Config, WorkerFn, WorkerRef, WorkerSpec};
///
/// let echo: WorkerRef<String, String> = WorkerFn::arc("echo", |s: String| async move { s });
///
/// let spec = WorkerSpec::with_defaults(echo.clone(), &Config::default());
/// assert_eq!(spec.inbox_capacity(), 10);
///
/// let tight = WorkerSpec::new(echo, 0);
/// assert_eq!(tight.inbox_capacity(), 1);
/// ```
pub struct WorkerSpec<P, R> {
    worker: WorkerRef<P, R>,
    inbox_capacity: usize,
}

impl<P, R> Clone for WorkerSpec<P, R> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
            inbox_capacity: self.inbox_capacity,
        }
    }
}

impl<P, R> WorkerSpec<P, R> {
    /// Creates a spec with an explicit inbox capacity (clamped to at least 1).
    pub fn new(worker: WorkerRef<P, R>, inbox_capacity: usize) -> Self {
        Self {
            worker,
            inbox_capacity: inbox_capacity.max(1),
        }
    }

    /// Creates a spec inheriting the inbox capacity from `cfg`.
    pub fn with_defaults(worker: WorkerRef<P, R>, cfg: &Config) -> Self {
        Self::new(worker, cfg.inbox_capacity_clamped())
    }

    /// Returns the worker implementation.
    pub fn worker(&self) -> &WorkerRef<P, R> {
        &self.worker
    }

    /// Returns the inbox capacity.
    pub fn inbox_capacity(&self) -> usize {
        self.inbox_capacity
    }
}
