//! Ticket channel registry
//!
//! One outbound channel per ticket id. Delivery is fire-and-forget: a failed
//! send drops the channel and is never retried or reported as an error.
//! A client never sees its ticket move backwards: a snapshot older than the
//! last one pushed is discarded.

use std::collections::HashMap;

use helpdesk_shared::{ServerMessage, Ticket, TicketId, TicketState};
use parking_lot::RwLock;
use uuid::Uuid;

use super::channel::ClientChannel;

/// Outcome of a [`NotificationHub::notify`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No client is registered for the ticket
    NoChannel,
    /// The client was gone; its channel has been removed
    Dropped,
    /// The client was already sent a later state
    Stale,
}

struct Slot {
    channel: ClientChannel,
    /// Last state pushed through `notify`
    last_pushed: Option<TicketState>,
}

/// Maps ticket ids to the channel of the client that submitted them
#[derive(Default)]
pub struct NotificationHub {
    channels: RwLock<HashMap<TicketId, Slot>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a channel to a ticket, replacing any previous one
    pub fn register(&self, ticket_id: TicketId, channel: ClientChannel) {
        let session_id = channel.session_id;
        let mut channels = self.channels.write();
        let slot = Slot {
            channel,
            last_pushed: None,
        };
        if let Some(previous) = channels.insert(ticket_id, slot) {
            tracing::debug!(
                ticket_id = %ticket_id,
                session_id = %previous.channel.session_id,
                "Replaced notification channel"
            );
        }

        tracing::debug!(
            ticket_id = %ticket_id,
            session_id = %session_id,
            open_channels = channels.len(),
            "Notification channel registered"
        );
    }

    /// Push the ticket snapshot to its client.
    ///
    /// A `RESOLVED` ticket gets no further updates, so its channel is removed
    /// once the push is queued. The check, the send and the removal happen
    /// under one write lock so concurrent pushes for a ticket stay ordered.
    pub fn notify(&self, ticket: &Ticket) -> Delivery {
        let mut channels = self.channels.write();
        let Some(slot) = channels.get_mut(&ticket.id) else {
            return Delivery::NoChannel;
        };

        if slot.last_pushed.is_some_and(|last| ticket.state < last) {
            tracing::debug!(
                ticket_id = %ticket.id,
                session_id = %slot.channel.session_id,
                state = %ticket.state,
                "Discarding stale ticket update"
            );
            return Delivery::Stale;
        }

        let message = ServerMessage::TicketUpdated {
            ticket: ticket.clone(),
        };

        // Unbounded send never waits, so holding the lock here is fine
        match slot.channel.send(message) {
            Ok(()) => {
                tracing::debug!(
                    ticket_id = %ticket.id,
                    session_id = %slot.channel.session_id,
                    state = %ticket.state,
                    "Ticket update pushed"
                );
                slot.last_pushed = Some(ticket.state);
                if ticket.state.is_terminal() {
                    channels.remove(&ticket.id);
                }
                Delivery::Delivered
            }
            Err(_) => {
                tracing::warn!(
                    ticket_id = %ticket.id,
                    session_id = %slot.channel.session_id,
                    "Client channel closed, dropping it"
                );
                channels.remove(&ticket.id);
                Delivery::Dropped
            }
        }
    }

    /// Remove the channel for a ticket. Idempotent.
    pub fn retire(&self, ticket_id: TicketId) {
        if let Some(slot) = self.channels.write().remove(&ticket_id) {
            tracing::debug!(
                ticket_id = %ticket_id,
                session_id = %slot.channel.session_id,
                "Notification channel retired"
            );
        }
    }

    /// Remove the channel only if it still belongs to `session_id`
    pub fn remove_session(&self, ticket_id: TicketId, session_id: Uuid) -> bool {
        let mut channels = self.channels.write();
        match channels.get(&ticket_id) {
            Some(slot) if slot.channel.session_id == session_id => {
                channels.remove(&ticket_id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, ticket_id: TicketId) -> bool {
        self.channels.read().contains_key(&ticket_id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }
}
