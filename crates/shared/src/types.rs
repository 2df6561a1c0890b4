//! Ticket model shared across the helpdesk

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{TransitionError, ValidationError};
use crate::protocol::ClientSubmission;

/// Keywords that make a ticket `HIGH` priority
pub const HIGH_PRIORITY_KEYWORDS: &[&str] = &["urgente", "bloqueado", "emergencia"];

/// Keywords that make a ticket `MEDIUM` priority
pub const MEDIUM_PRIORITY_KEYWORDS: &[&str] = &["error", "falla", "fallo", "lento"];

pub const MAX_CLIENT_NAME_CHARS: usize = 128;
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Ticket ID, assigned by the dispatcher starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TicketId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// =============================================================================
// Priority
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Claim order, highest first
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Derive a priority from the free-text description.
    ///
    /// Case-insensitive substring match against the high keyword set, then the
    /// medium set. Anything else is `LOW`.
    pub fn classify(description: &str) -> Self {
        let text = description.to_lowercase();

        if HIGH_PRIORITY_KEYWORDS.iter().any(|word| text.contains(word)) {
            Priority::High
        } else if MEDIUM_PRIORITY_KEYWORDS.iter().any(|word| text.contains(word)) {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    /// Position in [`Priority::ALL`]
    pub fn rank(&self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

// =============================================================================
// Ticket State
// =============================================================================

/// Ordered by lifecycle position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketState {
    Pending,
    InProgress,
    Resolved,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Pending => "PENDING",
            TicketState::InProgress => "IN_PROGRESS",
            TicketState::Resolved => "RESOLVED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketState::Resolved)
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TicketState::Pending),
            "IN_PROGRESS" => Ok(TicketState::InProgress),
            "RESOLVED" => Ok(TicketState::Resolved),
            other => Err(format!("unknown ticket state '{}'", other)),
        }
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// Validated submission that has not been registered yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub client_name: String,
    pub description: String,
    pub priority: Priority,
}

impl NewTicket {
    /// Validate and normalize a submission.
    ///
    /// Names and descriptions are trimmed. Without an explicit priority the
    /// description is classified by keyword.
    pub fn new(
        client_name: impl AsRef<str>,
        description: impl AsRef<str>,
        priority: Option<Priority>,
    ) -> Result<Self, ValidationError> {
        let client_name = client_name.as_ref().trim();
        let description = description.as_ref().trim();

        if client_name.is_empty() {
            return Err(ValidationError::Empty("client_name"));
        }
        if description.is_empty() {
            return Err(ValidationError::Empty("description"));
        }
        if client_name.chars().count() > MAX_CLIENT_NAME_CHARS {
            return Err(ValidationError::TooLong {
                field: "client_name",
                max: MAX_CLIENT_NAME_CHARS,
            });
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::TooLong {
                field: "description",
                max: MAX_DESCRIPTION_CHARS,
            });
        }

        Ok(Self {
            client_name: client_name.to_string(),
            description: description.to_string(),
            priority: priority.unwrap_or_else(|| Priority::classify(description)),
        })
    }

    /// Attach the dispatcher-assigned id. The result starts `PENDING`.
    pub fn into_ticket(self, id: TicketId) -> Ticket {
        let now = OffsetDateTime::now_utc();
        Ticket {
            id,
            client_name: self.client_name,
            description: self.description,
            priority: self.priority,
            state: TicketState::Pending,
            assigned_technician: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<ClientSubmission> for NewTicket {
    type Error = ValidationError;

    fn try_from(submission: ClientSubmission) -> Result<Self, Self::Error> {
        NewTicket::new(
            submission.client_name,
            submission.description,
            submission.priority,
        )
    }
}

/// Support ticket with its current lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub client_name: String,
    pub description: String,
    pub priority: Priority,
    pub state: TicketState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_technician: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Ticket {
    /// `PENDING -> IN_PROGRESS`, recording the technician
    pub fn start(&mut self, technician: impl Into<String>) -> Result<(), TransitionError> {
        if self.state != TicketState::Pending {
            return Err(TransitionError {
                from: self.state,
                to: TicketState::InProgress,
            });
        }
        self.state = TicketState::InProgress;
        self.assigned_technician = Some(technician.into());
        self.touch();
        Ok(())
    }

    /// `IN_PROGRESS -> RESOLVED`
    pub fn resolve(&mut self) -> Result<(), TransitionError> {
        if self.state != TicketState::InProgress {
            return Err(TransitionError {
                from: self.state,
                to: TicketState::Resolved,
            });
        }
        self.state = TicketState::Resolved;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.id, self.client_name, self.priority, self.state
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(Priority::classify("urgente: servidor caído"), Priority::High);
        assert_eq!(Priority::classify("Usuario BLOQUEADO"), Priority::High);
        assert_eq!(Priority::classify("error de red"), Priority::Medium);
        assert_eq!(Priority::classify("el equipo va lento"), Priority::Medium);
        assert_eq!(Priority::classify("consulta general"), Priority::Low);
    }

    #[test]
    fn test_classify_high_wins_over_medium() {
        assert_eq!(
            Priority::classify("Error urgente en la impresora"),
            Priority::High
        );
    }

    #[test]
    fn test_classify_is_substring_match() {
        // "errores" contains "error"
        assert_eq!(Priority::classify("varios errores"), Priority::Medium);
        // Non-ASCII lowercasing
        assert_eq!(Priority::classify("EMERGENCIA ÉLECTRICA"), Priority::High);
    }

    #[test]
    fn test_new_ticket_validation() {
        assert_eq!(
            NewTicket::new("  ", "algo", None),
            Err(ValidationError::Empty("client_name"))
        );
        assert_eq!(
            NewTicket::new("Ana", "\n", None),
            Err(ValidationError::Empty("description"))
        );
        let long = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(matches!(
            NewTicket::new("Ana", long, None),
            Err(ValidationError::TooLong { field: "description", .. })
        ));
    }

    #[test]
    fn test_new_ticket_trims_and_classifies() {
        let ticket = NewTicket::new(" Ana ", " fallo en VPN ", None).unwrap();
        assert_eq!(ticket.client_name, "Ana");
        assert_eq!(ticket.description, "fallo en VPN");
        assert_eq!(ticket.priority, Priority::Medium);

        // Explicit priority overrides keywords
        let ticket = NewTicket::new("Ana", "urgente", Some(Priority::Low)).unwrap();
        assert_eq!(ticket.priority, Priority::Low);
    }

    #[test]
    fn test_lifecycle_is_forward_only() {
        let mut ticket = NewTicket::new("Ana", "consulta", None)
            .unwrap()
            .into_ticket(TicketId(1));
        assert_eq!(ticket.state, TicketState::Pending);
        assert!(ticket.assigned_technician.is_none());

        // Cannot skip IN_PROGRESS
        let err = ticket.resolve().unwrap_err();
        assert_eq!(err.from, TicketState::Pending);
        assert_eq!(ticket.state, TicketState::Pending);

        ticket.start("Technician-1").unwrap();
        assert_eq!(ticket.state, TicketState::InProgress);
        assert_eq!(ticket.assigned_technician.as_deref(), Some("Technician-1"));

        // Technician is never reassigned
        assert!(ticket.start("Technician-2").is_err());
        assert_eq!(ticket.assigned_technician.as_deref(), Some("Technician-1"));

        ticket.resolve().unwrap();
        assert_eq!(ticket.state, TicketState::Resolved);
        assert!(ticket.resolve().is_err());
        assert!(ticket.start("Technician-3").is_err());
        assert_eq!(ticket.assigned_technician.as_deref(), Some("Technician-1"));
    }

    #[test]
    fn test_wire_names() {
        let ticket = NewTicket::new("Ana", "urgente", None)
            .unwrap()
            .into_ticket(TicketId(7));
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["priority"], "HIGH");
        assert_eq!(json["state"], "PENDING");
        assert!(json.get("assigned_technician").is_none());
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!("in_progress".parse::<TicketState>(), Ok(TicketState::InProgress));
        assert_eq!("Medium".parse::<Priority>(), Ok(Priority::Medium));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
