//! Client channel
//!
//! The writing half of a submitting client's connection. The listener owns the
//! receiving end and forwards every message to the socket.

use helpdesk_shared::ServerMessage;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound channel to one connected client
#[derive(Debug, Clone)]
pub struct ClientChannel {
    /// Unique session ID for the underlying connection
    pub session_id: Uuid,

    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl ClientChannel {
    pub fn new(sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sender,
        }
    }

    /// Create a channel together with the receiver its connection drains
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Queue a message for this client without blocking
    ///
    /// Returns Err if the connection side has gone away
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed message
    pub fn send(&self, message: ServerMessage) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(message)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
