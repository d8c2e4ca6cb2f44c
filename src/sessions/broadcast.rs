//! Fan-out of context updates to every live session
//!
//! Producers (the workspace watcher) call [`BroadcastDispatcher::publish`],
//! which never blocks: updates go into a bounded ring and, when it is full,
//! the oldest pending update is overwritten. A single dispatcher task drains
//! the ring and delivers each update to all registered sessions. Delivery is
//! best effort; there is no backpressure towards the producer.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use super::{SessionId, SessionRegistry};
use crate::chat::WsOutgoing;

/// Default number of pending updates kept before the oldest is dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Outcome of one fan-out pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions that accepted the event
    pub delivered: usize,
    /// Sessions whose queue was full; they stay registered
    pub skipped: usize,
    /// Sessions found closed and removed from the registry
    pub pruned: Vec<SessionId>,
}

/// Delivers update events to every session in a [`SessionRegistry`]
#[derive(Debug)]
pub struct BroadcastDispatcher {
    registry: Arc<SessionRegistry>,
    queue: broadcast::Sender<WsOutgoing>,
}

impl BroadcastDispatcher {
    /// Create a dispatcher with a bounded pending-update queue
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, capacity: usize) -> Self {
        let (queue, _) = broadcast::channel(capacity.max(1));
        Self { registry, queue }
    }

    /// The registry this dispatcher delivers to
    #[must_use]
    pub const fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Enqueue an event for delivery without waiting
    ///
    /// Safe to call from any thread. Events published while no dispatcher
    /// task is running are dropped.
    pub fn publish(&self, event: WsOutgoing) {
        if self.queue.send(event).is_err() {
            tracing::debug!("no dispatcher running, update dropped");
        }
    }

    /// Start the dispatcher task draining the queue
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.queue.subscribe();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let report = this.broadcast(&event).await;
                        tracing::trace!(
                            delivered = report.delivered,
                            skipped = report.skipped,
                            pruned = report.pruned.len(),
                            "broadcast complete"
                        );
                    }
                    Err(RecvError::Lagged(dropped)) => {
                        tracing::warn!(dropped, "broadcast queue full, oldest updates dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("broadcast dispatcher stopped");
        })
    }

    /// Deliver `event` to every registered session
    ///
    /// Membership is copied first so the registry is never mutated while it is
    /// being iterated; closed sessions are unregistered after the full pass.
    pub async fn broadcast(&self, event: &WsOutgoing) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, tx) in self.registry.senders().await {
            match tx.try_send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(session_id = %id, "session queue full, update dropped");
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => report.pruned.push(id),
            }
        }

        for id in &report.pruned {
            self.registry.unregister(*id).await;
            tracing::info!(session_id = %id, "pruned disconnected session");
        }

        report
    }
}
