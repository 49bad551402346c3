//! MCP JSON-RPC request handler.
//!
//! Requests arrive on the message endpoint addressed to a session; the
//! response is queued on that session's stream and also returned to the
//! caller.

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use xmind_mcp_types::{
    error_codes, InitializeParams, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolContent,
    JSONRPC_VERSION, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};

use super::error::{McpError, ProtocolError};
use super::event::McpEvent;
use super::session::{Handshake, McpSession};
use crate::state::AppState;
use crate::tools::ToolCatalog;

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "xmind-mcp";

/// Validate and decode a posted JSON-RPC envelope.
pub fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, ProtocolError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(ref object) = value else {
        return Err(ProtocolError::invalid(Value::Null, "request must be a JSON object"));
    };
    let id = object.get("id").cloned().unwrap_or(Value::Null);

    match object.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        Some(other) => {
            return Err(ProtocolError::invalid(
                id,
                format!("unsupported jsonrpc version '{}'", other),
            ))
        }
        None => return Err(ProtocolError::invalid(id, "missing 'jsonrpc' member")),
    }
    if !object.get("method").is_some_and(Value::is_string) {
        return Err(ProtocolError::invalid(id, "missing 'method' member"));
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::invalid(id, e.to_string()))
}

/// Pick the protocol revision to answer `initialize` with.
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|s| *s == v))
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// MCP request handler.
pub struct McpHandler;

impl McpHandler {
    /// Run a request against a session and queue the response on its stream.
    ///
    /// Returns `Ok(None)` for notifications.
    pub async fn dispatch(
        state: &AppState,
        session_id: &str,
        request: JsonRpcRequest,
    ) -> Result<Option<JsonRpcResponse>, McpError> {
        let session = state
            .sessions()
            .get_session(session_id)
            .filter(|s| !s.is_closed())
            .ok_or_else(|| McpError::SessionNotFound(session_id.to_string()))?;

        let Some(response) = Self::handle_request(state.tools(), &session, request).await else {
            return Ok(None);
        };

        match state
            .sessions()
            .enqueue(session_id, McpEvent::Response(response.clone()))
        {
            Ok(()) => Ok(Some(response)),
            Err(McpError::QueueOverflow(id)) => {
                warn!("MCP: Response not queued for session {} (queue full)", id);
                Ok(Some(response))
            }
            Err(e) => Err(e),
        }
    }

    /// Handle an MCP JSON-RPC request.
    pub async fn handle_request(
        tools: &ToolCatalog,
        session: &McpSession,
        mut request: JsonRpcRequest,
    ) -> Option<JsonRpcResponse> {
        debug!(
            "MCP: Handling method {} for session {}",
            request.method, session.id
        );

        if request.is_notification() {
            Self::handle_notification(session, &request.method);
            return None;
        }
        let id = request.id.take().unwrap_or_default();

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(session, id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => Self::handle_list_tools(tools, id).await,
            "tools/call" => Self::handle_call_tool(tools, session, id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_notification(session: &McpSession, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                debug!("MCP: Client confirmed initialization for session {}", session.id)
            }
            "notifications/cancelled" => {
                debug!("MCP: Client cancelled a request on session {}", session.id)
            }
            other => debug!("MCP: Ignoring notification {} on session {}", other, session.id),
        }
    }

    /// Handle the initialize request.
    fn handle_initialize(
        session: &McpSession,
        id: Value,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: InitializeParams = match params {
            None | Some(Value::Null) => InitializeParams::default(),
            Some(value) => match serde_json::from_value(value) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        error_codes::INVALID_PARAMS,
                        format!("Invalid initialize params: {}", e),
                    )
                }
            },
        };

        let version = negotiate_protocol_version(params.protocol_version.as_deref());
        let client = params
            .client_info
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let handshake = Handshake {
            protocol_version: version.to_string(),
            capabilities: params.capabilities,
            client_info: params.client_info,
        };
        match session.mark_initialized(handshake) {
            Ok(true) => info!(
                "MCP: Session {} re-initialized by {} (protocol {})",
                session.id, client, version
            ),
            Ok(false) => info!(
                "MCP: Session {} initialized by {} (protocol {})",
                session.id, client, version
            ),
            Err(e) => {
                return JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string());
            }
        }

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": version,
                "capabilities": {
                    "tools": { "listChanged": true }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handle the tools/list request.
    async fn handle_list_tools(tools: &ToolCatalog, id: Value) -> JsonRpcResponse {
        let listing = tools.list().await;
        if let Some(errors) = listing.error_summary() {
            warn!("MCP: Returning partial tool list: {}", errors);
        }
        JsonRpcResponse::success(id, json!({ "tools": listing.tools }))
    }

    /// Handle the tools/call request.
    async fn handle_call_tool(
        tools: &ToolCatalog,
        session: &McpSession,
        id: Value,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        if !session.is_initialized() {
            return JsonRpcResponse::error(
                id,
                error_codes::SERVER_NOT_INITIALIZED,
                "Session not initialized: call initialize first",
            );
        }

        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                )
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing tools/call params",
                )
            }
        };

        info!("MCP: Calling tool {} for session {}", params.name, session.id);
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        match tools.call(&params.name, arguments).await {
            Ok(value) => {
                let text =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [ToolContent::Text { text }],
                        "isError": false
                    }),
                )
            }
            Err(e) => {
                error!("MCP: Tool {} failed: {}", params.name, e);
                JsonRpcResponse::from_error(id, e.to_jsonrpc())
            }
        }
    }
}
