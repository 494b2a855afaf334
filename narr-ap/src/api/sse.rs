//! Server-Sent Events (SSE) broadcaster
//!
//! Streams session events to connected clients. Each connection first gets
//! an `InitialState` event with the full session snapshot.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use narr_common::NarrEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Subscribe before taking the snapshot so nothing falls in between
    let rx = ctx.state.subscribe_events();
    let initial = NarrEvent::InitialState {
        session: ctx.state.snapshot().await,
        timestamp: chrono::Utc::now(),
    };

    let updates = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Some(event),
            Err(e) => {
                // Lagged receiver: the client resyncs from the next events
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    let stream = stream::once(async move { initial })
        .chain(updates)
        .take_until(ctx.state.shutdown_requested())
        .filter_map(|event| async move { to_sse_event(&event).map(Ok) });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &NarrEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => {
            debug!("Broadcasting SSE event: {}", event.event_type());
            Some(Event::default().event(event.event_type()).data(json))
        }
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}
