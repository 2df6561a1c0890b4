//! Dispatcher facade
//!
//! Ties the queue, the notification hub and the change feed together. Every
//! entry point that changes a ticket goes through here so that clients and
//! feed subscribers see the same sequence of states.

use std::sync::Arc;

use helpdesk_shared::{
    NewTicket, Priority, ServerMessage, Ticket, TicketId, TicketState, ValidationError,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, DispatchResult};
use crate::events::{EventBroadcaster, TicketEvent};
use crate::hub::{ClientChannel, Delivery, NotificationHub};
use crate::queue::DispatchQueue;

/// Technician name recorded when an operator resolves a pending ticket
pub const OPERATOR: &str = "Operator";

/// Ticket and channel counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub open_channels: usize,
}

/// Cheaply cloneable handle to the dispatch engine
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<DispatchQueue>,
    hub: Arc<NotificationHub>,
    events: EventBroadcaster,
}

impl Dispatcher {
    pub fn new(event_capacity: usize) -> Self {
        Self {
            queue: Arc::new(DispatchQueue::new()),
            hub: Arc::new(NotificationHub::new()),
            events: EventBroadcaster::new(event_capacity),
        }
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Register a ticket that has no client connection
    pub fn submit(&self, new_ticket: NewTicket) -> Ticket {
        let ticket = self.queue.submit(new_ticket);
        self.events.publish(TicketEvent::Created {
            ticket: ticket.clone(),
        });
        ticket
    }

    /// Register a ticket and attach the submitting client's channel.
    ///
    /// The acknowledgement is queued on the channel and the channel registered
    /// before any technician can claim the ticket, so the client always sees
    /// `accepted` first and never misses the `IN_PROGRESS` push.
    pub fn submit_with_channel(&self, new_ticket: NewTicket, channel: ClientChannel) -> Ticket {
        let hub = &self.hub;
        let ticket = self.queue.submit_with(new_ticket, |ticket| {
            let ack = ServerMessage::Accepted {
                ticket: ticket.clone(),
            };
            match channel.send(ack) {
                Ok(()) => hub.register(ticket.id, channel),
                Err(_) => {
                    tracing::debug!(
                        ticket_id = %ticket.id,
                        session_id = %channel.session_id,
                        "Client left before acknowledgement"
                    );
                }
            }
        });

        self.events.publish(TicketEvent::Created {
            ticket: ticket.clone(),
        });
        ticket
    }

    /// Block until a ticket can be claimed for `technician`
    pub async fn claim(
        &self,
        technician: &str,
        cancel: &CancellationToken,
    ) -> DispatchResult<Ticket> {
        let ticket = self.queue.claim(technician, cancel).await?;
        self.events.publish(TicketEvent::Assigned {
            ticket: ticket.clone(),
        });
        Ok(ticket)
    }

    /// `IN_PROGRESS -> RESOLVED`
    pub fn complete(&self, id: TicketId) -> DispatchResult<Ticket> {
        let ticket = self.queue.complete(id)?;
        tracing::info!(
            ticket_id = %ticket.id,
            technician = ticket.assigned_technician.as_deref().unwrap_or_default(),
            "Ticket resolved"
        );
        self.events.publish(TicketEvent::Resolved {
            ticket: ticket.clone(),
        });
        Ok(ticket)
    }

    pub fn notify(&self, ticket: &Ticket) -> Delivery {
        self.hub.notify(ticket)
    }

    pub fn retire(&self, id: TicketId) {
        self.hub.retire(id);
    }

    /// Operator override: hand a pending ticket to a named technician
    pub fn assign_manual(&self, id: TicketId, technician: &str) -> DispatchResult<Ticket> {
        let technician = technician.trim();
        if technician.is_empty() {
            return Err(ValidationError::Empty("technician").into());
        }

        let ticket = self.queue.assign(id, technician)?;
        tracing::info!(
            ticket_id = %ticket.id,
            technician = %technician,
            "Ticket assigned manually"
        );

        self.hub.notify(&ticket);
        self.events.publish(TicketEvent::Assigned {
            ticket: ticket.clone(),
        });
        Ok(ticket)
    }

    /// Operator override: resolve a pending or in-progress ticket.
    ///
    /// A pending ticket is first assigned to [`OPERATOR`] so it still passes
    /// through `IN_PROGRESS`.
    pub fn resolve_manual(&self, id: TicketId) -> DispatchResult<Ticket> {
        if self.queue.get(id)?.state == TicketState::Pending {
            match self.assign_manual(id, OPERATOR) {
                Ok(_) => {}
                // A technician claimed it in the meantime; resolve their claim
                Err(DispatchError::InvalidState {
                    state: TicketState::InProgress,
                    ..
                }) => {}
                Err(e) => return Err(e),
            }
        }

        let ticket = self.complete(id)?;
        self.hub.notify(&ticket);
        self.hub.retire(id);
        Ok(ticket)
    }

    pub fn get(&self, id: TicketId) -> DispatchResult<Ticket> {
        self.queue.get(id)
    }

    /// All tickets in submission order, optionally filtered
    pub fn list(&self, state: Option<TicketState>, priority: Option<Priority>) -> Vec<Ticket> {
        self.queue
            .snapshot()
            .into_iter()
            .filter(|t| state.map_or(true, |s| t.state == s))
            .filter(|t| priority.map_or(true, |p| t.priority == p))
            .collect()
    }

    pub fn stats(&self) -> DispatchStats {
        let tickets = self.queue.stats();
        DispatchStats {
            total: tickets.total,
            pending: tickets.pending,
            in_progress: tickets.in_progress,
            resolved: tickets.resolved,
            open_channels: self.hub.channel_count(),
        }
    }
}
