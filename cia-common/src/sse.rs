//! Server-Sent Events (SSE) utilities
//!
//! Bridges the EventBus broadcast channel onto an axum SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::CiaEvent;

/// Heartbeat cadence for all CIA SSE streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Turn an EventBus receiver into an SSE stream
///
/// Sends a `ConnectionStatus` event first, then every CiaEvent as a named
/// event carrying its JSON. A lagging client skips the dropped events and
/// keeps streaming. The stream ends when `shutdown` is cancelled or the bus
/// is dropped, so graceful server shutdown is not held open by SSE clients.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     cia_common::sse::event_sse_stream(
///         "cia-api",
///         state.event_bus.subscribe(),
///         state.shutdown.clone(),
///     )
/// }
/// ```
pub fn event_sse_stream(
    service_name: &'static str,
    mut rx: broadcast::Receiver<CiaEvent>,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                received = rx.recv() => Some(received),
            };
            let Some(received) = received else {
                info!("SSE: {} shutting down, closing stream", service_name);
                break;
            };

            match received {
                Ok(event) => {
                    let event_type = event.event_type().to_string();
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            debug!("SSE: Broadcasting {}", event_type);
                            yield Ok(Event::default().event(event_type).data(json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
