//! Per-connection protocol handling

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use helpdesk_shared::{ClientSubmission, NewTicket, ServerMessage};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;

use super::{ConnectionError, ListenerConfig};
use crate::dispatcher::Dispatcher;
use crate::hub::ClientChannel;

type LineFramed = Framed<TcpStream, LinesCodec>;

pub(super) async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    config: ListenerConfig,
    cancel: CancellationToken,
) {
    match handle_connection(stream, &dispatcher, &config, &cancel).await {
        Ok(()) => tracing::debug!(peer = %peer, "Client connection closed"),
        Err(ConnectionError::Rejected(reason)) => {
            tracing::warn!(peer = %peer, reason = %reason, "Submission rejected")
        }
        Err(e) => tracing::warn!(peer = %peer, error = %e, "Client connection failed"),
    }
}

async fn handle_connection(
    stream: TcpStream,
    dispatcher: &Dispatcher,
    config: &ListenerConfig,
    cancel: &CancellationToken,
) -> Result<(), ConnectionError> {
    let mut framed = Framed::new(
        stream,
        LinesCodec::new_with_max_length(config.max_frame_bytes),
    );

    let Some(new_ticket) = read_submission(&mut framed, config, cancel).await? else {
        return Ok(());
    };

    let (channel, mut updates) = ClientChannel::pair();
    let session_id = channel.session_id;
    let ticket = dispatcher.submit_with_channel(new_ticket, channel);
    tracing::info!(
        ticket_id = %ticket.id,
        session_id = %session_id,
        priority = %ticket.priority,
        "Ticket submitted"
    );

    let (mut sink, mut incoming) = framed.split();
    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),

            update = updates.recv() => {
                // None: the hub let go of the channel
                let Some(message) = update else { break Ok(()) };
                let is_final = message.is_final();
                let line = match serde_json::to_string(&message) {
                    Ok(line) => line,
                    Err(e) => break Err(e.into()),
                };
                if let Err(e) = sink.send(line).await {
                    break Err(e.into());
                }
                if is_final {
                    break Ok(());
                }
            }

            frame = incoming.next() => match frame {
                None => {
                    tracing::debug!(ticket_id = %ticket.id, "Client hung up");
                    break Ok(());
                }
                Some(Err(e)) => break Err(e.into()),
                Some(Ok(_)) => {
                    tracing::debug!(ticket_id = %ticket.id, "Ignoring extra client frame");
                }
            },
        }
    };

    // The ticket lives on; only this connection's channel goes away
    dispatcher.hub().remove_session(ticket.id, session_id);
    result
}

/// Read and validate the first frame. `Ok(None)` means shutdown.
async fn read_submission(
    framed: &mut LineFramed,
    config: &ListenerConfig,
    cancel: &CancellationToken,
) -> Result<Option<NewTicket>, ConnectionError> {
    let first = tokio::select! {
        _ = cancel.cancelled() => return Ok(None),
        first = tokio::time::timeout(config.submission_timeout, framed.next()) => first
            .map_err(|_| ConnectionError::Timeout(config.submission_timeout))?,
    };

    let line = match first {
        None => return Err(ConnectionError::ClosedEarly),
        Some(Ok(line)) => line,
        Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
            let reason = format!("submission exceeds {} bytes", config.max_frame_bytes);
            return Err(reject(framed, reason).await);
        }
        Some(Err(e)) => return Err(e.into()),
    };

    match parse_submission(&line) {
        Ok(new_ticket) => Ok(Some(new_ticket)),
        Err(reason) => Err(reject(framed, reason).await),
    }
}

fn parse_submission(line: &str) -> Result<NewTicket, String> {
    let submission: ClientSubmission =
        serde_json::from_str(line).map_err(|e| format!("malformed submission: {}", e))?;
    NewTicket::try_from(submission).map_err(|e| e.to_string())
}

/// Tell the client why, best-effort, and produce the error that ends the connection
async fn reject(framed: &mut LineFramed, reason: String) -> ConnectionError {
    let message = ServerMessage::Rejected {
        reason: reason.clone(),
    };
    if let Ok(line) = serde_json::to_string(&message) {
        let _ = framed.send(line).await;
    }
    ConnectionError::Rejected(reason)
}
