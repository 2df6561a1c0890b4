//! Error types for the ticket model

use thiserror::Error;

use crate::types::TicketState;

/// Rejected lifecycle transition. The ticket is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal ticket transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: TicketState,
    pub to: TicketState,
}

/// Rejected ticket submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}
