//! Helpdesk Dispatch Engine
//!
//! The shared priority queue technicians claim work from, the notification hub
//! that pushes state changes back to the submitting client, and the TCP
//! listener clients submit tickets through.
//!
//! # Architecture
//!
//! - **Queue**: arena of all tickets plus one FIFO pending lane per priority
//! - **Hub**: ticket id -> outbound client channel, best-effort delivery
//! - **Dispatcher**: cloneable facade combining both with the change feed
//! - **Listener**: one task per client connection, newline-delimited JSON
//! - **Client**: the submitting side of the same protocol

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod hub;
pub mod listener;
pub mod queue;

pub use client::{ClientError, TicketClient};
pub use dispatcher::{DispatchStats, Dispatcher, OPERATOR};
pub use error::{DispatchError, DispatchResult};
pub use events::{EventBroadcaster, TicketEvent};
pub use hub::{ClientChannel, Delivery, NotificationHub};
pub use listener::{ConnectionError, ListenerConfig, TicketListener};
pub use queue::{DispatchQueue, QueueStats};
