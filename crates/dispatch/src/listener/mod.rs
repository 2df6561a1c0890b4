//! TCP ticket listener
//!
//! Accepts client connections and hands each one to its own task. A client
//! sends one submission and then receives pushes until its ticket is resolved.

mod handler;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::codec::LinesCodecError;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::Dispatcher;

/// Per-connection limits
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// How long a new connection may take to send its submission
    pub submission_timeout: Duration,
    /// Longest accepted line, in bytes
    pub max_frame_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            submission_timeout: Duration::from_secs(10),
            max_frame_bytes: 64 * 1024,
        }
    }
}

/// Errors that end a single client connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Framing error: {0}")]
    Frame(#[from] LinesCodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No submission within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed before submission")]
    ClosedEarly,

    #[error("Submission rejected: {0}")]
    Rejected(String),
}

/// Accept loop for ticket submissions
pub struct TicketListener {
    listener: TcpListener,
    dispatcher: Dispatcher,
    config: ListenerConfig,
}

impl TicketListener {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        dispatcher: Dispatcher,
        config: ListenerConfig,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `cancel` fires.
    ///
    /// Connection tasks observe the same token and close their sockets on
    /// shutdown.
    pub async fn run(self, cancel: CancellationToken) {
        let local_addr = self.listener.local_addr().ok();
        tracing::info!(addr = ?local_addr, "Ticket listener started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(peer = %peer, "Client connected");
                        tokio::spawn(handler::serve_connection(
                            stream,
                            peer,
                            self.dispatcher.clone(),
                            self.config.clone(),
                            cancel.child_token(),
                        ));
                    }
                    Err(e) => {
                        // Usually transient, e.g. out of file descriptors
                        tracing::error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        tracing::info!(addr = ?local_addr, "Ticket listener stopped");
    }
}
