//! # Request / reply envelope.
//!
//! A dispatch creates one [`Request`] (payload + single-use reply slot) and hands
//! the matching [`Reply`] to the caller:
//!
//! ```text
//! Request::new(payload) ─┬─► Request { payload, reply: oneshot::Sender }  ──► worker inbox
//!                        └─► Reply   { rx: oneshot::Receiver }            ──► caller
//! ```
//!
//! ## Rules
//! - The worker is the only writer: [`Request::respond`] consumes the request.
//! - The caller reads at most once: [`Reply::recv`] consumes the reply.
//! - Dropping a request unanswered resolves the reply with [`ReplyError::Abandoned`].
//! - Timing out on a reply is local to the caller; a late answer is discarded.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::ReplyError;

/// A payload travelling to exactly one worker, with the slot for its answer.
#[derive(Debug)]
pub struct Request<P, R> {
    payload: P,
    reply: oneshot::Sender<R>,
}

impl<P, R> Request<P, R> {
    /// Creates a request and the caller's side of its reply slot.
    pub fn new(payload: P) -> (Self, Reply<R>) {
        let (tx, rx) = oneshot::channel();
        (Self { payload, reply: tx }, Reply { rx })
    }

    /// Borrows the payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Returns `true` if the caller has already dropped its [`Reply`].
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }

    /// Splits the request so the payload can be consumed before responding.
    pub fn into_parts(self) -> (P, Responder<R>) {
        (self.payload, Responder { tx: self.reply })
    }

    /// Answers the request. Returns the value back if the caller is gone.
    pub fn respond(self, value: R) -> Result<(), R> {
        self.reply.send(value)
    }
}

/// Write side of a reply slot, detached from its payload.
#[derive(Debug)]
pub struct Responder<R> {
    tx: oneshot::Sender<R>,
}

impl<R> Responder<R> {
    /// Writes the single response. Returns the value back if the caller is gone.
    pub fn send(self, value: R) -> Result<(), R> {
        self.tx.send(value)
    }
}

/// Caller side of a dispatched request.
#[derive(Debug)]
pub struct Reply<R> {
    rx: oneshot::Receiver<R>,
}

impl<R> Reply<R> {
    /// Waits for the answer with no deadline.
    ///
    /// A wedged worker makes this wait forever; prefer [`recv_timeout`](Self::recv_timeout).
    pub async fn recv(self) -> Result<R, ReplyError> {
        self.rx.await.map_err(|_| ReplyError::Abandoned)
    }

    /// Waits for the answer for at most `timeout`.
    ///
    /// `Duration::ZERO` waits forever.
    pub async fn recv_timeout(self, timeout: Duration) -> Result<R, ReplyError> {
        if timeout.is_zero() {
            return self.recv().await;
        }
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ReplyError::Abandoned),
            Err(_elapsed) => Err(ReplyError::Timeout { timeout }),
        }
    }

    /// Non-blocking check; `Ok(None)` means the answer has not arrived yet.
    pub fn try_recv(&mut self) -> Result<Option<R>, ReplyError> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(ReplyError::Abandoned),
        }
    }
}
