//! Error types for the MCP session transport.

use serde_json::Value;
use xmind_mcp_types::{error_codes, JsonRpcResponse};

use super::session::SessionId;

/// Session-level failures surfaced to the HTTP caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum McpError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} already has an attached stream")]
    StreamAlreadyAttached(SessionId),

    #[error("Event queue overflow for session {0}")]
    QueueOverflow(SessionId),
}

/// Malformed JSON-RPC envelope, rejected before dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid request: {reason}")]
    InvalidRequest { id: Value, reason: String },
}

impl ProtocolError {
    pub(crate) fn invalid(id: Value, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            id,
            reason: reason.into(),
        }
    }

    /// JSON-RPC error object describing this rejection.
    pub fn to_response(&self) -> JsonRpcResponse {
        match self {
            Self::Parse(_) => {
                JsonRpcResponse::error(Value::Null, error_codes::PARSE_ERROR, self.to_string())
            }
            Self::InvalidRequest { id, .. } => {
                JsonRpcResponse::error(id.clone(), error_codes::INVALID_REQUEST, self.to_string())
            }
        }
    }
}
