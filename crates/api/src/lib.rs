//! Helpdesk API Library
//!
//! Configuration, the operator HTTP API and the server bootstrap that wires
//! the ticket listener, the technicians and the HTTP routes together.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Config, LogFormat};
pub use error::{ApiError, ApiResult};
pub use server::Server;
pub use state::AppState;
