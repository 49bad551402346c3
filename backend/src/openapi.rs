//! OpenAPI documentation configuration.

use utoipa::OpenApi;
use xmind_mcp_types::{
    ErrorResponse, HealthResponse, JsonRpcError, JsonRpcResponse, ServerInfoResponse,
    ToolDescriptor, ToolListResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::sse::sse_stream,
        crate::api::messages::post_message,
        crate::api::messages::delete_session,
        crate::api::info::root,
        crate::api::info::health,
        crate::api::info::list_tools,
    ),
    components(
        schemas(
            JsonRpcResponse,
            JsonRpcError,
            ToolDescriptor,
            ToolListResponse,
            ServerInfoResponse,
            HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "mcp", description = "MCP transport over Server-Sent Events"),
        (name = "tools", description = "Tool catalog endpoints"),
        (name = "System", description = "System information endpoints")
    ),
    info(
        title = "XMind MCP Server API",
        version = "0.3.0",
        description = "MCP JSON-RPC over Server-Sent Events for XMind mind map tools",
        license(
            name = "MIT OR Apache-2.0"
        )
    )
)]
pub struct ApiDoc;
