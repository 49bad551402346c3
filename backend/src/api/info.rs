//! Informational endpoints: discovery, health and the REST tool listing.

use axum::{extract::State, Json};
use xmind_mcp_types::{HealthResponse, ServerInfoResponse, ToolListResponse};

use crate::state::AppState;

/// Describe the server and where its transport endpoints live.
#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    responses(
        (status = 200, description = "Server information", body = ServerInfoResponse)
    )
)]
pub async fn root() -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        message: "XMind MCP Server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sse_url: "/sse".to_string(),
        messages_url: "/messages/{session_id}".to_string(),
        docs_url: "/docs".to_string(),
        tools_url: "/tools".to_string(),
    })
}

/// Liveness check with the number of open sessions.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        active_sessions: state.sessions().session_count(),
    })
}

/// List every tool in the catalog.
///
/// If a provider fails, the tools of the remaining providers are returned
/// together with an `error` message.
#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    responses(
        (status = 200, description = "Tool catalog", body = ToolListResponse)
    )
)]
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let listing = state.tools().list().await;
    let error = listing.error_summary();
    Json(ToolListResponse {
        tools: listing.tools,
        error,
    })
}
