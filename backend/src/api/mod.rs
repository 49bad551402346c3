//! API handlers.

pub mod info;
pub mod messages;
pub mod sse;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use xmind_mcp_types::ErrorResponse;

use crate::mcp::McpError;

impl McpError {
    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::StreamAlreadyAttached(_) => StatusCode::CONFLICT,
            Self::QueueOverflow(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for McpError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
