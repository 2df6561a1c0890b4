//! Dispatch error types

use helpdesk_shared::{TicketId, TicketState, ValidationError};
use thiserror::Error;

/// Errors returned by the dispatch engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Ticket {0} not found")]
    NotFound(TicketId),

    #[error("Ticket {id} is {state}, expected {expected}")]
    InvalidState {
        id: TicketId,
        state: TicketState,
        expected: TicketState,
    },

    #[error("Claim cancelled")]
    Cancelled,

    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
