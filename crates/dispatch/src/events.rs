//! Ticket change feed
//!
//! Every state change is published on a broadcast channel. Subscribers that
//! fall behind miss events instead of slowing the engine down.

use std::sync::Arc;

use helpdesk_shared::Ticket;
use serde::Serialize;
use tokio::sync::broadcast;

/// A ticket state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TicketEvent {
    /// Registered as `PENDING`
    Created { ticket: Ticket },

    /// Moved to `IN_PROGRESS`, by a technician or an operator
    Assigned { ticket: Ticket },

    Resolved { ticket: Ticket },
}

impl TicketEvent {
    pub fn ticket(&self) -> &Ticket {
        match self {
            TicketEvent::Created { ticket }
            | TicketEvent::Assigned { ticket }
            | TicketEvent::Resolved { ticket } => ticket,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TicketEvent::Created { .. } => "created",
            TicketEvent::Assigned { .. } => "assigned",
            TicketEvent::Resolved { .. } => "resolved",
        }
    }
}

/// Fan-out of [`TicketEvent`]s to any number of subscribers
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<TicketEvent>>,
}

impl EventBroadcaster {
    /// `capacity` is how many events a subscriber may lag before skipping
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: TicketEvent) {
        // No subscribers is the common case
        if let Err(e) = self.sender.send(event) {
            tracing::trace!(event = e.0.kind(), "No change feed subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
