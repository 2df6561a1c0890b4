//! Server-Sent Events change feed

use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::state::AppState;

/// Stream every ticket change until the client leaves or the server stops
pub async fn ticket_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.dispatcher.events().subscribe();
    let shutdown = state.shutdown.clone();

    let stream = BroadcastStream::new(receiver)
        .map(|item| match item {
            Ok(event) => Event::default().event(event.kind()).json_data(&event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event subscriber lagged");
                Ok(Event::default().event("lagged").data(skipped.to_string()))
            }
        })
        .take_until(shutdown.cancelled_owned());

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
