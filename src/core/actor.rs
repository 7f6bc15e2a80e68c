//! # WorkerActor: the serve loop behind one worker inbox.
//!
//! ```text
//! WorkerManager::spawn ──► WorkerActor::run(token)
//!
//! publish WorkerStarted
//! loop {
//!   ├─► token cancelled        → exit (Terminated)
//!   ├─► inbox.recv() == None   → exit (InboxClosed: every handle dropped)
//!   └─► Some(request)
//!         ├─► handle(payload) raced against token
//!         │     ├─ finished  → write exactly one reply
//!         │     │              (caller gone → ReplyDiscarded)
//!         │     └─ cancelled → drop reply unanswered, exit (Terminated)
//! }
//! close inbox, drop queued requests, publish WorkerStopped
//! ```
//!
//! ## Rules
//! - Requests are served **sequentially** in arrival order.
//! - After exit the inbox is closed, so every handle reports `Gone` on submission.
//! - Requests still queued at exit are dropped; their callers observe
//!   [`ReplyError::Abandoned`](crate::ReplyError::Abandoned).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    core::handle::WorkerId,
    envelope::Request,
    events::{Bus, Event, EventKind},
    workers::WorkerRef,
};

/// Why a worker actor left its loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActorExitReason {
    /// Termination token was cancelled.
    Terminated,
    /// All senders were dropped.
    InboxClosed,
}

impl ActorExitReason {
    fn as_reason(self) -> &'static str {
        match self {
            ActorExitReason::Terminated => "terminated",
            ActorExitReason::InboxClosed => "inbox_closed",
        }
    }
}

/// Serves one worker's inbox until termination.
pub(crate) struct WorkerActor<P, R> {
    id: WorkerId,
    worker: WorkerRef<P, R>,
    inbox: mpsc::Receiver<Request<P, R>>,
    bus: Bus,
}

impl<P, R> WorkerActor<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        id: WorkerId,
        worker: WorkerRef<P, R>,
        inbox: mpsc::Receiver<Request<P, R>>,
        bus: Bus,
    ) -> Self {
        Self {
            id,
            worker,
            inbox,
            bus,
        }
    }

    /// Runs the serve loop until `token` is cancelled or every handle is dropped.
    pub(crate) async fn run(mut self, token: CancellationToken) -> ActorExitReason {
        self.bus
            .publish(Event::new(EventKind::WorkerStarted).with_worker(self.id));

        let reason = self.serve(&token).await;

        self.inbox.close();
        while self.inbox.try_recv().is_ok() {}

        self.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_worker(self.id)
                .with_reason(reason.as_reason()),
        );
        reason
    }

    async fn serve(&mut self, token: &CancellationToken) -> ActorExitReason {
        loop {
            let request = tokio::select! {
                biased;
                _ = token.cancelled() => return ActorExitReason::Terminated,
                msg = self.inbox.recv() => match msg {
                    Some(request) => request,
                    None => return ActorExitReason::InboxClosed,
                },
            };

            let (payload, responder) = request.into_parts();
            let response = tokio::select! {
                biased;
                _ = token.cancelled() => return ActorExitReason::Terminated,
                response = self.worker.handle(payload) => response,
            };

            if responder.send(response).is_err() {
                self.bus
                    .publish(Event::new(EventKind::ReplyDiscarded).with_worker(self.id));
            }
        }
    }
}
