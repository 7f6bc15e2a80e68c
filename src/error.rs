//! Error types used by the poolvisor runtime and its callers.
//!
//! This module defines the caller-facing error enums:
//!
//! - [`DispatchError`]: a dispatch call found no worker to accept the request.
//! - [`ReplyError`]: the caller gave up on, or lost, the reply to a dispatched request.
//! - [`RequestError`]: either of the two above, for the one-shot [`Pool::request`](crate::Pool::request).
//! - [`RuntimeError`]: failures of the worker runtime itself (shutdown).
//!
//! A worker that turns out to be gone during submission is **not** an error here:
//! it is absorbed inside [`Dispatcher::dispatch`](crate::Dispatcher::dispatch)
//! by eviction and retry, and only surfaces as [`DispatchError::PoolEmpty`]
//! once no worker is left.
//!
//! All types provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a dispatch call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No live worker handle remained after all eviction attempts.
    ///
    /// The caller must not wait for a reply in this case.
    #[error("no available worker")]
    PoolEmpty,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::DispatchError;
    ///
    /// assert_eq!(DispatchError::PoolEmpty.as_label(), "dispatch_pool_empty");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::PoolEmpty => "dispatch_pool_empty",
        }
    }
}

/// # Errors observed while awaiting a reply.
///
/// Both variants are caller-local: they never change dispatcher state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyError {
    /// The caller stopped waiting. The outcome is unknown: the worker may still
    /// answer later, and that answer is discarded.
    #[error("no reply within {timeout:?}")]
    Timeout {
        /// The caller-side timeout that elapsed.
        timeout: Duration,
    },

    /// The worker dropped the request without answering (it was terminated
    /// while the request was queued or being handled).
    #[error("request abandoned by worker")]
    Abandoned,
}

impl ReplyError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::ReplyError;
    /// use std::time::Duration;
    ///
    /// let err = ReplyError::Timeout { timeout: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "reply_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReplyError::Timeout { .. } => "reply_timeout",
            ReplyError::Abandoned => "reply_abandoned",
        }
    }
}

/// # Errors produced by a full request round trip (dispatch + await reply).
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The request could not be dispatched.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The request was dispatched but no reply was received.
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl RequestError {
    /// Returns the label of the underlying error.
    pub fn as_label(&self) -> &'static str {
        match self {
            RequestError::Dispatch(e) => e.as_label(),
            RequestError::Reply(e) => e.as_label(),
        }
    }
}

/// # Errors produced by the worker runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the workers that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
        }
    }
}
