//! Ticket socket protocol
//!
//! Every frame is a single JSON object on its own line. A client opens a
//! connection, sends one [`ClientSubmission`], and then only reads
//! [`ServerMessage`]s until the ticket is resolved or the server closes.

use serde::{Deserialize, Serialize};

use crate::types::{Priority, Ticket, TicketState};

// =============================================================================
// Client-to-Server
// =============================================================================

/// The one frame a client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSubmission {
    pub client_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

// =============================================================================
// Server-to-Client
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Submission registered; carries the assigned id
    Accepted { ticket: Ticket },

    /// Full snapshot after a state change
    TicketUpdated { ticket: Ticket },

    /// Submission refused, the connection is closed afterwards
    Rejected { reason: String },
}

impl ServerMessage {
    pub fn ticket(&self) -> Option<&Ticket> {
        match self {
            ServerMessage::Accepted { ticket } | ServerMessage::TicketUpdated { ticket } => {
                Some(ticket)
            }
            ServerMessage::Rejected { .. } => None,
        }
    }

    /// No further frames follow this one
    pub fn is_final(&self) -> bool {
        match self {
            ServerMessage::Rejected { .. } => true,
            other => other
                .ticket()
                .is_some_and(|t| t.state == TicketState::Resolved),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{NewTicket, TicketId};

    #[test]
    fn test_submission_priority_is_optional() {
        let json = r#"{"client_name":"Ana","description":"consulta general"}"#;
        let submission: ClientSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.priority, None);

        let json = r#"{"client_name":"Ana","description":"x","priority":"MEDIUM"}"#;
        let submission: ClientSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.priority, Some(Priority::Medium));
    }

    #[test]
    fn test_server_message_tagging() {
        let event = ServerMessage::Rejected {
            reason: "description must not be empty".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"rejected""#));
        assert!(event.is_final());
    }

    #[test]
    fn test_resolved_update_is_final() {
        let mut ticket = NewTicket::new("Ana", "error de red", None)
            .unwrap()
            .into_ticket(TicketId(3));

        let accepted = ServerMessage::Accepted {
            ticket: ticket.clone(),
        };
        assert!(!accepted.is_final());

        ticket.start("Technician-1").unwrap();
        ticket.resolve().unwrap();
        let update = ServerMessage::TicketUpdated { ticket };
        assert!(update.is_final());

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "ticket_updated");
        assert_eq!(json["ticket"]["state"], "RESOLVED");
        assert_eq!(json["ticket"]["assigned_technician"], "Technician-1");
    }
}
