//! Server-Sent Events (SSE) for session events
//!
//! One shared broadcast channel carries every session's events; each stream
//! forwards only the events addressed to its session.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use wkune_common::events::SessionEvent;
use wkune_common::uuid_utils::normalize_session_code;

use crate::api::error::ApiResult;
use crate::AppState;

/// Convert an event to an SSE frame if it belongs to `code`
pub fn to_sse_event(code: &str, event: &SessionEvent) -> Option<Event> {
    if event.session_code() != code {
        return None;
    }
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// GET /sessions/:code/events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let code = normalize_session_code(&code);
    state.coordinator.get_session(&code).await?;
    let events = state.coordinator.events();
    let rx = events.subscribe();
    debug!(
        "New SSE client for session {} ({} subscriber(s))",
        code,
        events.subscriber_count()
    );

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let frame: Option<Result<Event, Infallible>> = match result {
            Ok(event) => to_sse_event(&code, &event).map(Ok),
            Err(e) => {
                // Lagged receivers skip ahead; clients re-fetch state anyway
                warn!("SSE stream error: {:?}", e);
                None
            }
        };
        async move { frame }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_for_other_sessions_are_dropped() {
        let event = SessionEvent::refresh("AB3K9Z");
        assert!(to_sse_event("AB3K9Z", &event).is_some());
        assert!(to_sse_event("ZZZZZZ", &event).is_none());
    }
}
