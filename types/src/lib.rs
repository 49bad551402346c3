//! Shared wire types for the XMind MCP server.
//!
//! This crate contains the JSON-RPC envelopes, MCP handshake and tool types,
//! and REST response bodies shared between the server and its clients/tests.

/// Default port for the MCP server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address for the MCP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub mod api;
pub mod jsonrpc;
pub mod mcp;

// Re-export commonly used types
pub use api::{ErrorResponse, HealthResponse, ServerInfoResponse, ToolListResponse};
pub use jsonrpc::{
    error_codes, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JSONRPC_VERSION,
};
pub use mcp::{
    ClientCapabilities, ClientInfo, InitializeParams, ToolCallParams, ToolContent,
    ToolDescriptor, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
