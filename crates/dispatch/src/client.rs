//! Ticket submission client
//!
//! Speaks the submitting side of the ticket socket protocol.

use std::io;

use futures::{SinkExt, StreamExt};
use helpdesk_shared::{ClientSubmission, ServerMessage, Ticket, TicketState};
use thiserror::Error;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Framing error: {0}")]
    Frame(#[from] LinesCodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ticket rejected: {0}")]
    Rejected(String),

    #[error("Server closed the connection")]
    Disconnected,

    #[error("Unexpected message: {0}")]
    Unexpected(String),
}

/// One connection, one ticket
pub struct TicketClient {
    framed: Framed<TcpStream, LinesCodec>,
}

impl TicketClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new()),
        })
    }

    /// Send the submission and wait for the acknowledgement
    pub async fn submit(&mut self, submission: &ClientSubmission) -> Result<Ticket, ClientError> {
        self.framed.send(serde_json::to_string(submission)?).await?;

        match self.read_message().await? {
            Some(ServerMessage::Accepted { ticket }) => Ok(ticket),
            Some(ServerMessage::Rejected { reason }) => Err(ClientError::Rejected(reason)),
            Some(other) => Err(ClientError::Unexpected(format!("{:?}", other))),
            None => Err(ClientError::Disconnected),
        }
    }

    /// Next pushed snapshot, `None` once the server has closed
    pub async fn next_update(&mut self) -> Result<Option<Ticket>, ClientError> {
        match self.read_message().await? {
            Some(ServerMessage::TicketUpdated { ticket }) => Ok(Some(ticket)),
            Some(other) => Err(ClientError::Unexpected(format!("{:?}", other))),
            None => Ok(None),
        }
    }

    /// Follow updates until the ticket is resolved
    pub async fn wait_resolved<F>(&mut self, mut on_update: F) -> Result<Ticket, ClientError>
    where
        F: FnMut(&Ticket),
    {
        while let Some(ticket) = self.next_update().await? {
            on_update(&ticket);
            if ticket.state == TicketState::Resolved {
                return Ok(ticket);
            }
        }
        Err(ClientError::Disconnected)
    }

    async fn read_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        match self.framed.next().await {
            Some(line) => Ok(Some(serde_json::from_str(&line?)?)),
            None => Ok(None),
        }
    }
}
