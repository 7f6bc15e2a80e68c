//! # Worker identity and handles.
//!
//! A [`WorkerHandle`] is the sending side of one worker's inbox, tagged with the
//! worker's [`WorkerId`]. Handles are cheap to clone; all clones reach the same inbox.
//!
//! Submission reports a first-class outcome instead of panicking or hanging:
//!
//! ```text
//! try_submit(req) ──► Accepted
//!                 ├─► Full(req)   inbox at capacity, request handed back
//!                 └─► Gone(req)   inbox closed (worker terminated), request handed back
//! ```
//!
//! The request is handed back on failure, so a retry against another handle
//! reuses the same request and reply slot.

use std::fmt;

use tokio::sync::mpsc;

use crate::envelope::Request;

/// Stable identity of a worker, unique within one [`WorkerManager`](crate::WorkerManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Outcome of one submission attempt.
#[derive(Debug)]
pub enum Submission<P, R> {
    /// The inbox accepted the request.
    Accepted,
    /// The inbox is at capacity.
    Full(Request<P, R>),
    /// The inbox is closed; the worker is gone for good.
    Gone(Request<P, R>),
}

/// Sending side of one worker's inbox.
pub struct WorkerHandle<P, R> {
    id: WorkerId,
    tx: mpsc::Sender<Request<P, R>>,
}

impl<P, R> Clone for WorkerHandle<P, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

impl<P, R> fmt::Debug for WorkerHandle<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<P, R> WorkerHandle<P, R> {
    /// Pairs an inbox sender with the identity of the worker behind it.
    pub fn new(id: WorkerId, tx: mpsc::Sender<Request<P, R>>) -> Self {
        Self { id, tx }
    }

    /// Identity of the worker behind this handle.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns `true` once the worker has released its inbox.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Returns `true` if both handles reach the same inbox.
    pub fn same_inbox(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }

    /// Non-blocking submission.
    pub fn try_submit(&self, req: Request<P, R>) -> Submission<P, R> {
        match self.tx.try_send(req) {
            Ok(()) => Submission::Accepted,
            Err(mpsc::error::TrySendError::Full(req)) => Submission::Full(req),
            Err(mpsc::error::TrySendError::Closed(req)) => Submission::Gone(req),
        }
    }

    /// Submission that waits for inbox capacity. Never returns `Full`.
    pub async fn submit(&self, req: Request<P, R>) -> Submission<P, R> {
        match self.tx.send(req).await {
            Ok(()) => Submission::Accepted,
            Err(mpsc::error::SendError(req)) => Submission::Gone(req),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed() {
        assert_eq!(WorkerId::new(12).to_string(), "worker-12");
    }

    #[test]
    fn try_submit_distinguishes_full_from_gone() {
        let (tx, rx) = mpsc::channel(1);
        let h = WorkerHandle::<u8, u8>::new(WorkerId::new(1), tx);

        let (first, _r1) = Request::new(1);
        assert!(matches!(h.try_submit(first), Submission::Accepted));

        let (second, _r2) = Request::new(2);
        let back = match h.try_submit(second) {
            Submission::Full(req) => req,
            other => panic!("expected Full, got {other:?}"),
        };
        assert_eq!(*back.payload(), 2);

        drop(rx);
        assert!(h.is_closed());
        assert!(matches!(h.try_submit(back), Submission::Gone(_)));
    }

    #[tokio::test]
    async fn submit_on_closed_inbox_returns_request() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let h = WorkerHandle::<&str, ()>::new(WorkerId::new(9), tx);
        let (req, _reply) = Request::new("ping");
        match h.submit(req).await {
            Submission::Gone(req) => assert_eq!(*req.payload(), "ping"),
            other => panic!("expected Gone, got {other:?}"),
        }
    }

    #[test]
    fn clones_share_inbox() {
        let (tx, _rx) = mpsc::channel::<Request<(), ()>>(1);
        let a = WorkerHandle::new(WorkerId::new(3), tx);
        let b = a.clone();
        assert!(a.same_inbox(&b));
        assert_eq!(a.id(), b.id());
    }
}
