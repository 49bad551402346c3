//! Application state management.

use std::sync::Arc;
use tracing::info;

use crate::config::{Config, TransportConfig};
use crate::mcp::McpSessionManager;
use crate::tools::{FileTools, ToolCatalog, ToolProvider};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Live MCP sessions, indexed by ID
    sessions: McpSessionManager,
    /// Tool providers reachable through `tools/list` and `tools/call`
    tools: ToolCatalog,
    /// SSE transport settings
    transport: TransportConfig,
}

impl AppState {
    /// Create new application state with the given tool catalog.
    pub fn new(tools: ToolCatalog, transport: TransportConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions: McpSessionManager::new(transport.queue_settings()),
                tools,
                transport,
            }),
        }
    }

    /// Build state from loaded configuration, with the built-in file tools.
    pub fn from_config(config: &Config) -> Self {
        info!("Tools root directory: {}", config.tools_root.display());
        let tools = ToolCatalog::new().with_provider(FileTools::new(&config.tools_root));
        info!("Tool catalog ready with {} provider(s)", tools.provider_count());
        Self::new(tools, config.transport.clone())
    }

    pub fn sessions(&self) -> &McpSessionManager {
        &self.inner.sessions
    }

    pub fn tools(&self) -> &ToolCatalog {
        &self.inner.tools
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.inner.transport
    }

    /// Add a tool provider and tell subscribed sessions the list changed.
    pub fn register_tool_provider(&self, provider: Arc<dyn ToolProvider>) {
        self.inner.tools.register(provider);
        let notified = self.inner.sessions.notify_tools_changed();
        if notified > 0 {
            info!("Notified {} session(s) of tool list change", notified);
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpEvent, McpHandler};
    use crate::tools::test_support::EchoTools;
    use serde_json::json;
    use xmind_mcp_types::JsonRpcRequest;

    #[tokio::test]
    async fn test_register_provider_notifies_subscribed_sessions() {
        let state = AppState::new(ToolCatalog::new(), TransportConfig::default());
        let subscribed = state.sessions().create_session();
        let silent = state.sessions().create_session();

        let init = |caps| {
            JsonRpcRequest::new("1", "initialize", Some(json!({ "capabilities": caps })))
        };
        McpHandler::dispatch(&state, &subscribed, init(json!({"tools": {"listChanged": true}})))
            .await
            .unwrap();
        McpHandler::dispatch(&state, &silent, init(json!({})))
            .await
            .unwrap();

        state.register_tool_provider(Arc::new(EchoTools));
        assert_eq!(state.tools().provider_count(), 1);

        let subscribed = state.sessions().get_session(&subscribed).unwrap();
        let silent = state.sessions().get_session(&silent).unwrap();
        // initialize response, then the notification
        assert_eq!(subscribed.queue().len(), 2);
        assert_eq!(silent.queue().len(), 1);

        subscribed.queue().recv().await.unwrap();
        match subscribed.queue().recv().await.unwrap() {
            McpEvent::Notification(n) => assert_eq!(n.method, "notifications/tools/list_changed"),
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_default_state_has_file_tools() {
        let state = AppState::default();
        assert_eq!(state.tools().provider_count(), 1);
        assert_eq!(state.sessions().session_count(), 0);
        assert_eq!(state.transport().keepalive_secs, 15);
    }
}
