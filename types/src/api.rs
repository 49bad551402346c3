//! REST response types for the informational endpoints.

use crate::mcp::ToolDescriptor;
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// ============================================================================
// Discovery
// ============================================================================

/// Response of `GET /`, pointing clients at the transport endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ServerInfoResponse {
    pub message: String,
    pub version: String,
    /// Path of the SSE stream endpoint.
    pub sse_url: String,
    /// Path template of the message endpoint (`{session_id}` placeholder).
    pub messages_url: String,
    pub docs_url: String,
    pub tools_url: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 timestamp of the check.
    pub timestamp: String,
    pub active_sessions: usize,
}

/// Response of `GET /tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ToolListResponse {
    pub tools: Vec<ToolDescriptor>,
    /// Set when a provider failed and the list is partial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Error Response
// ============================================================================

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
