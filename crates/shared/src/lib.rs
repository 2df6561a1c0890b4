//! Helpdesk Shared Types and Utilities
//!
//! This crate contains the ticket model, priority classification and the
//! client wire protocol shared by the dispatcher, the technicians and clients.

pub mod error;
pub mod protocol;
pub mod types;

pub use error::*;
pub use protocol::{ClientSubmission, ServerMessage};
pub use types::*;
