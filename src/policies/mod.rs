//! Submission policies.
//!
//! This module groups the knobs that control **whether** a dispatcher keeps
//! trying a saturated worker and **how long** it waits between tries.
//!
//! ## Contents
//! - [`BackpressurePolicy`] wait / retry / evict on a full inbox
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`] randomization to keep concurrent callers apart
//!
//! ## Quick wiring
//! ```text
//! Config { backpressure, backoff, .. }
//!      └─► Dispatcher::submit uses:
//!           - backpressure to pick wait / try_send
//!           - backoff.next(retry) between tries on a full inbox
//! ```

mod backoff;
mod backpressure;
mod jitter;

pub use backoff::BackoffPolicy;
pub use backpressure::BackpressurePolicy;
pub use jitter::JitterPolicy;
