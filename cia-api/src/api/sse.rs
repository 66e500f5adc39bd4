//! Server-Sent Events stream of CIA events

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/v1/events
///
/// Streams every CiaEvent (watch changes, new impact cards, finished research,
/// provider failures, action updates, refresh cycles).
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    cia_common::sse::event_sse_stream(
        "cia-api",
        state.event_bus.subscribe(),
        state.shutdown.clone(),
    )
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}
