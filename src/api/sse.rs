//! Server-Sent Events support

use crate::runtime::SseEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init_event: SseEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(sse_event_to_axum(event))),
        Err(e) => {
            // A lagged client catches up on the next deck event
            tracing::warn!(error = %e, "SSE subscriber lagged");
            None
        }
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = sse_event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn sse_event_payload(event: SseEvent) -> (&'static str, serde_json::Value) {
    match event {
        SseEvent::Init {
            presentation,
            history,
            state,
            agent_working,
        } => (
            "init",
            json!({
                "type": "init",
                "presentation": presentation,
                "history": history,
                "state": state,
                "agent_working": agent_working
            }),
        ),
        SseEvent::Chat { entry } => (
            "chat",
            json!({
                "type": "chat",
                "entry": entry
            }),
        ),
        SseEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        SseEvent::Deck { presentation } => (
            "deck",
            json!({
                "type": "deck",
                "presentation": presentation
            }),
        ),
        SseEvent::Navigate { index } => (
            "navigate",
            json!({
                "type": "navigate",
                "index": index
            }),
        ),
        SseEvent::TurnDone { outcome } => (
            "turn_done",
            json!({
                "type": "turn_done",
                "outcome": outcome
            }),
        ),
        SseEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
