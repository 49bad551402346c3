//! Server-Sent Events endpoint for MCP sessions.

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::info;

use crate::mcp::{open_session_stream, McpError};
use crate::state::AppState;

/// Open an MCP event stream.
///
/// Creates a session and streams its events until the client disconnects
/// or the session is deleted. The first event carries the session id:
///
/// ```text
/// event: message
/// data: {"jsonrpc":"2.0","method":"connected","params":{"session_id":"..."}}
/// ```
///
/// Requests for the session are then posted to `/messages/{session_id}`.
#[utoipa::path(
    get,
    path = "/sse",
    tag = "mcp",
    responses(
        (status = 200, description = "Event stream opened", content_type = "text/event-stream")
    )
)]
pub async fn sse_stream(State(state): State<AppState>) -> Result<impl IntoResponse, McpError> {
    let (session_id, events) = open_session_stream(state.sessions())?;
    info!(
        "MCP: SSE stream opened for session {} (active sessions: {})",
        session_id,
        state.sessions().session_count()
    );

    let keep_alive = KeepAlive::new()
        .interval(state.transport().keepalive())
        .text("keep-alive");
    let sse = Sse::new(frames(events)).keep_alive(keep_alive);

    Ok((
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        sse,
    ))
}

fn frames(
    events: impl Stream<Item = crate::mcp::McpEvent> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    events.map(|event| Ok(event.to_sse_event()))
}
