//! Tool catalog: the boundary to the engines that implement MCP tools.
//!
//! Providers are consulted in registration order. A provider that fails to
//! list its tools is skipped so the rest of the catalog stays usable.

mod files;

pub use files::FileTools;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use xmind_mcp_types::{error_codes, JsonRpcError, ToolDescriptor};

/// Error type for tool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidParams(String),

    #[error("Tool call failed: {0}")]
    Failed(#[from] anyhow::Error),
}

impl ToolError {
    /// JSON-RPC error object for this failure.
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        let code = match self {
            Self::UnknownTool(_) | Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::Failed(_) => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError::new(code, self.to_string())
    }
}

/// A source of MCP tools.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Tools offered by this provider, in display order.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Run a tool. Returns `Ok(None)` if this provider does not own `tool`.
    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Option<Value>, ToolError>;
}

/// Result of listing the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct ToolListing {
    pub tools: Vec<ToolDescriptor>,
    /// One entry per provider that failed to list.
    pub errors: Vec<String>,
}

impl ToolListing {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Provider failures joined into one message.
    pub fn error_summary(&self) -> Option<String> {
        self.is_partial().then(|| self.errors.join("; "))
    }
}

/// Ordered set of tool providers.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    providers: Arc<RwLock<Vec<Arc<dyn ToolProvider>>>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_provider(self, provider: impl ToolProvider + 'static) -> Self {
        self.register(Arc::new(provider));
        self
    }

    pub fn register(&self, provider: Arc<dyn ToolProvider>) {
        debug!("Registering tool provider: {}", provider.name());
        self.providers.write().push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.read().len()
    }

    fn snapshot(&self) -> Vec<Arc<dyn ToolProvider>> {
        self.providers.read().clone()
    }

    /// List every tool, tolerating provider failures.
    pub async fn list(&self) -> ToolListing {
        let mut listing = ToolListing::default();
        for provider in self.snapshot() {
            match provider.list_tools().await {
                Ok(tools) => listing.tools.extend(tools),
                Err(e) => {
                    warn!("Tool provider '{}' failed to list tools: {}", provider.name(), e);
                    listing.errors.push(format!("{}: {}", provider.name(), e));
                }
            }
        }
        listing
    }

    /// Route a call to the first provider that owns the tool.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value, ToolError> {
        for provider in self.snapshot() {
            if let Some(result) = provider.call_tool(tool, arguments.clone()).await? {
                return Ok(result);
            }
        }
        Err(ToolError::UnknownTool(tool.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{BrokenTools, EchoTools};
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_skips_failing_provider() {
        let catalog = ToolCatalog::new()
            .with_provider(BrokenTools)
            .with_provider(EchoTools);

        let listing = catalog.list().await;
        assert_eq!(listing.tools.len(), 1);
        assert_eq!(listing.tools[0].name, "echo");
        assert!(listing.is_partial());
        assert!(listing.error_summary().unwrap().contains("engine unavailable"));
    }

    #[tokio::test]
    async fn test_call_routes_to_owner() {
        let catalog = ToolCatalog::new()
            .with_provider(BrokenTools)
            .with_provider(EchoTools);
        let result = catalog.call("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let catalog = ToolCatalog::new().with_provider(EchoTools);
        let err = catalog.call("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "missing"));
        assert_eq!(err.to_jsonrpc().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_failure_maps_to_internal_error() {
        let catalog = ToolCatalog::new().with_provider(EchoTools);
        let err = catalog.call("explode", json!({})).await.unwrap_err();
        assert_eq!(err.to_jsonrpc().code, error_codes::INTERNAL_ERROR);
        assert!(err.to_jsonrpc().message.contains("boom"));
    }

    #[tokio::test]
    async fn test_empty_catalog_lists_nothing() {
        let listing = ToolCatalog::new().list().await;
        assert!(listing.tools.is_empty());
        assert!(listing.error_summary().is_none());
    }
}
