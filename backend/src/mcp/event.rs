//! Outbound events and their SSE framing.
//!
//! Every frame is written as `event: message` followed by a single
//! `data: <json>` line.

use axum::response::sse::Event;
use serde_json::{json, Value};
use xmind_mcp_types::{JsonRpcNotification, JsonRpcResponse, JSONRPC_VERSION};

/// SSE event name used for every frame.
pub const MESSAGE_EVENT: &str = "message";

/// JSON-RPC method of the first frame on every stream.
pub const CONNECTED_METHOD: &str = "connected";

/// Events that can be sent to MCP clients via SSE.
#[derive(Clone, Debug, PartialEq)]
pub enum McpEvent {
    /// First frame of a stream; tells the client its session id.
    Connected { session_id: String },
    /// Response to a request posted to the message endpoint.
    Response(JsonRpcResponse),
    /// Server-initiated notification.
    Notification(JsonRpcNotification),
}

impl McpEvent {
    /// JSON payload carried in the `data:` line.
    pub fn payload(&self) -> Value {
        match self {
            Self::Connected { session_id } => json!({
                "jsonrpc": JSONRPC_VERSION,
                "method": CONNECTED_METHOD,
                "params": { "session_id": session_id }
            }),
            Self::Response(response) => serde_json::to_value(response).unwrap_or(Value::Null),
            Self::Notification(notification) => {
                serde_json::to_value(notification).unwrap_or(Value::Null)
            }
        }
    }

    /// Render as one SSE frame.
    pub fn to_sse_event(&self) -> Event {
        Event::default()
            .event(MESSAGE_EVENT)
            .data(self.payload().to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Response(_) => "response",
            Self::Notification(_) => "notification",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_payload() {
        let event = McpEvent::Connected {
            session_id: "abc".to_string(),
        };
        let payload = event.payload();
        assert_eq!(payload["method"], "connected");
        assert_eq!(payload["params"]["session_id"], "abc");
    }

    #[test]
    fn test_response_payload_echoes_id() {
        let event = McpEvent::Response(JsonRpcResponse::success(json!("42"), json!({"ok": true})));
        let payload = event.payload();
        assert_eq!(payload["id"], "42");
        assert_eq!(payload["result"]["ok"], true);
    }
}
