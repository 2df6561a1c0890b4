//! Notification hub
//!
//! Pushes ticket state changes back to the client that submitted the ticket.
//!
//! # Architecture
//!
//! - **Channel**: outbound handle for one client connection, socket-agnostic
//! - **Registry**: ticket id -> channel map with best-effort delivery

pub mod channel;
pub mod registry;

pub use channel::ClientChannel;
pub use registry::{Delivery, NotificationHub};
