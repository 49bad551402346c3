//! Message endpoint: JSON-RPC requests addressed to an open session.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info, warn};
use xmind_mcp_types::{ErrorResponse, JsonRpcResponse};

use crate::mcp::{parse_request, McpError, McpHandler};
use crate::state::AppState;

/// Submit a JSON-RPC request to a session.
///
/// The response is queued on the session's event stream and also returned
/// in the body. Notifications are accepted without a response.
#[utoipa::path(
    post,
    path = "/messages/{session_id}",
    tag = "mcp",
    params(
        ("session_id" = String, Path, description = "Session ID from the connected event")
    ),
    request_body(
        content = String,
        description = "JSON-RPC 2.0 request",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Request dispatched", body = JsonRpcResponse),
        (status = 202, description = "Notification accepted"),
        (status = 400, description = "Malformed JSON-RPC envelope", body = JsonRpcResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Response {
    if !state.sessions().session_exists(&session_id) {
        warn!("MCP: Message for unknown session {}", session_id);
        return McpError::SessionNotFound(session_id).into_response();
    }

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("MCP: Rejected message for session {}: {}", session_id, e);
            return (StatusCode::BAD_REQUEST, Json(e.to_response())).into_response();
        }
    };
    debug!(
        "MCP: Received {} for session {}",
        request.method, session_id
    );

    match McpHandler::dispatch(&state, &session_id, request).await {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Terminate a session and close its event stream.
#[utoipa::path(
    delete,
    path = "/messages/{session_id}",
    tag = "mcp",
    params(
        ("session_id" = String, Path, description = "Session ID to terminate")
    ),
    responses(
        (status = 204, description = "Session terminated"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, McpError> {
    if state.sessions().remove_session(&session_id) {
        info!("MCP: Session {} terminated by client", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(McpError::SessionNotFound(session_id))
    }
}
