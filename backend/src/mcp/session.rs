//! MCP session management.
//!
//! A session is created when a client opens the SSE stream and lives until
//! that stream ends or the session is removed explicitly. Its id is the only
//! link between the stream and requests posted to the message endpoint.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use xmind_mcp_types::{ClientCapabilities, ClientInfo, JsonRpcNotification};

use super::error::McpError;
use super::event::McpEvent;
use super::queue::{EventQueue, OverflowPolicy, QueueError, DEFAULT_QUEUE_CAPACITY};

/// Opaque session identifier.
pub type SessionId = String;

/// Handshake state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stream is open, `initialize` not yet received.
    Created,
    /// `initialize` succeeded.
    Initialized,
    /// Removed from the registry; no further frames will be delivered.
    Closed,
}

/// What the client negotiated in `initialize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Handshake {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: Option<ClientInfo>,
}

/// An MCP session.
pub struct McpSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// When the session was created.
    pub created_at: Instant,
    /// Wall-clock creation time, for diagnostics.
    pub started_at: DateTime<Utc>,
    queue: EventQueue,
    state: RwLock<SessionState>,
    handshake: RwLock<Option<Handshake>>,
    attached: AtomicBool,
}

impl McpSession {
    fn new(id: SessionId, queue: EventQueue) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            started_at: Utc::now(),
            queue,
            state: RwLock::new(SessionState::Created),
            handshake: RwLock::new(None),
            attached: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == SessionState::Initialized
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Capabilities from the latest `initialize`; empty before the handshake.
    pub fn capabilities(&self) -> ClientCapabilities {
        self.handshake
            .read()
            .as_ref()
            .map(|h| h.capabilities.clone())
            .unwrap_or_default()
    }

    /// Record a successful `initialize`.
    ///
    /// Re-initializing replaces the previous handshake. Returns `true` when
    /// a previous handshake was replaced.
    pub fn mark_initialized(&self, handshake: Handshake) -> Result<bool, McpError> {
        let mut state = self.state.write();
        if *state == SessionState::Closed {
            return Err(McpError::SessionNotFound(self.id.clone()));
        }
        let replaced = self.handshake.write().replace(handshake).is_some();
        *state = SessionState::Initialized;
        debug!("MCP session {} marked as initialized", self.id);
        Ok(replaced)
    }

    /// Queue an event for the attached stream.
    pub fn send(&self, event: McpEvent) -> Result<(), QueueError> {
        self.queue.push(event)
    }

    /// Queue used by the stream writer.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Claim the single stream-writer slot. Returns `false` if already taken.
    pub fn attach(&self) -> bool {
        self.attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Get the session age.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn close(&self) {
        *self.state.write() = SessionState::Closed;
        self.queue.close();
    }
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("started_at", &self.started_at.to_rfc3339())
            .field("age", &self.age())
            .field("attached", &self.is_attached())
            .field("queued", &self.queue.len())
            .field("dropped", &self.queue.dropped())
            .finish()
    }
}

/// Queue sizing applied to every new session.
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// Manager for MCP sessions.
#[derive(Clone)]
pub struct McpSessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<McpSession>>>>,
    queue_settings: QueueSettings,
}

impl McpSessionManager {
    /// Create a new session manager.
    pub fn new(queue_settings: QueueSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            queue_settings,
        }
    }

    /// Create a new session and return its ID.
    pub fn create_session(&self) -> SessionId {
        let mut sessions = self.sessions.write();
        loop {
            let id = Uuid::new_v4().to_string();
            if let Entry::Vacant(slot) = sessions.entry(id.clone()) {
                let queue = EventQueue::new(
                    self.queue_settings.capacity,
                    self.queue_settings.overflow_policy,
                );
                slot.insert(Arc::new(McpSession::new(id.clone(), queue)));
                info!("Created MCP session: {}", id);
                return id;
            }
        }
    }

    /// Get a session by ID.
    pub fn get_session(&self, id: &str) -> Option<Arc<McpSession>> {
        self.sessions.read().get(id).cloned()
    }

    /// Check if a session exists.
    pub fn session_exists(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Remove a session, closing its queue so the attached stream ends.
    ///
    /// Removing an unknown or already removed session is a no-op.
    pub fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(session) => {
                session.close();
                info!(
                    "Removed MCP session: {} (started {}, lived {:.1}s, {} event(s) dropped)",
                    id,
                    session.started_at.to_rfc3339(),
                    session.age().as_secs_f64(),
                    session.queue().dropped()
                );
                true
            }
            None => false,
        }
    }

    /// Queue an event on a session's stream.
    pub fn enqueue(&self, id: &str, event: McpEvent) -> Result<(), McpError> {
        let session = self
            .get_session(id)
            .ok_or_else(|| McpError::SessionNotFound(id.to_string()))?;
        match session.send(event) {
            Ok(()) => Ok(()),
            Err(QueueError::Closed) => Err(McpError::SessionNotFound(id.to_string())),
            Err(QueueError::Full(_)) => {
                if session.queue().is_closed() {
                    // CloseSession policy shut the queue; drop the registry entry too.
                    self.remove_session(id);
                }
                Err(McpError::QueueOverflow(id.to_string()))
            }
        }
    }

    /// Send `notifications/tools/list_changed` to every initialized session
    /// whose client asked for it. Returns the number of sessions notified.
    pub fn notify_tools_changed(&self) -> usize {
        let targets: Vec<Arc<McpSession>> = self.sessions.read().values().cloned().collect();
        let mut notified = 0;
        for session in targets {
            if !session.is_initialized() || !session.capabilities().wants_tool_list_changes() {
                continue;
            }
            let notification = JsonRpcNotification::new("notifications/tools/list_changed", None);
            match self.enqueue(&session.id, McpEvent::Notification(notification)) {
                Ok(()) => notified += 1,
                Err(e) => warn!("Failed to notify session {}: {}", session.id, e),
            }
        }
        notified
    }

    /// Get the number of active sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove sessions that have no attached stream and are older than `max_age`.
    ///
    /// Sessions with a live stream are bound to that connection and never
    /// reaped here.
    pub fn cleanup_stale(&self, max_age: Duration) -> usize {
        let stale: Vec<SessionId> = self
            .sessions
            .read()
            .values()
            .filter(|s| !s.is_attached() && s.age() >= max_age)
            .map(|s| s.id.clone())
            .collect();

        let mut removed = 0;
        for id in stale {
            info!("Cleaning up stale MCP session: {}", id);
            if self.remove_session(&id) {
                removed += 1;
            }
        }
        removed
    }

    /// Remove every session. Used on server shutdown so open streams end.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<McpSession>> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.close();
        }
        if !drained.is_empty() {
            info!("Closed {} MCP session(s)", drained.len());
        }
        drained.len()
    }

    /// Periodically reclaim stale sessions in the background.
    pub fn spawn_reaper(&self, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = sessions.cleanup_stale(max_age);
                if removed > 0 {
                    debug!("Session reaper removed {} stale session(s)", removed);
                }
            }
        })
    }
}

impl Default for McpSessionManager {
    fn default() -> Self {
        Self::new(QueueSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use xmind_mcp_types::mcp::ListChangedCapability;
    use xmind_mcp_types::JsonRpcResponse;

    fn handshake(list_changed: bool) -> Handshake {
        Handshake {
            protocol_version: "2024-11-05".to_string(),
            capabilities: ClientCapabilities {
                tools: Some(ListChangedCapability { list_changed }),
                ..Default::default()
            },
            client_info: None,
        }
    }

    #[test]
    fn test_create_session_is_visible_immediately() {
        let sessions = McpSessionManager::default();
        let id = sessions.create_session();
        assert!(!id.is_empty());

        let session = sessions.get_session(&id).unwrap();
        assert_eq!(session.state(), SessionState::Created);
        assert!(session.queue().is_empty());
        assert_eq!(sessions.session_count(), 1);
    }

    #[test]
    fn test_debug_shows_start_time() {
        let sessions = McpSessionManager::default();
        let session = sessions.get_session(&sessions.create_session()).unwrap();
        assert!(session.started_at <= Utc::now());

        let debug = format!("{:?}", session);
        assert!(debug.contains(&session.started_at.to_rfc3339()));
        assert!(debug.contains("dropped: 0"));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let sessions = McpSessionManager::default();
        let ids: HashSet<_> = (0..500).map(|_| sessions.create_session()).collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(sessions.session_count(), 500);
    }

    #[test]
    fn test_remove_session_is_idempotent() {
        let sessions = McpSessionManager::default();
        let id = sessions.create_session();
        let other = sessions.create_session();

        assert!(sessions.remove_session(&id));
        assert!(!sessions.remove_session(&id));
        assert!(!sessions.remove_session("never-created"));

        assert!(sessions.get_session(&id).is_none());
        assert!(sessions.session_exists(&other));
        assert_eq!(sessions.session_count(), 1);
    }

    #[test]
    fn test_stale_handle_reports_closed() {
        let sessions = McpSessionManager::default();
        let id = sessions.create_session();
        let handle = sessions.get_session(&id).unwrap();

        sessions.remove_session(&id);

        assert!(handle.is_closed());
        assert!(handle.queue().is_closed());
        assert_eq!(
            handle.mark_initialized(Handshake::default()),
            Err(McpError::SessionNotFound(id.clone()))
        );
    }

    #[test]
    fn test_enqueue_unknown_session() {
        let sessions = McpSessionManager::default();
        let event = McpEvent::Response(JsonRpcResponse::success(json!(1), json!({})));
        assert_eq!(
            sessions.enqueue("missing", event),
            Err(McpError::SessionNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_mark_initialized_and_reinitialize() {
        let sessions = McpSessionManager::default();
        let id = sessions.create_session();
        let session = sessions.get_session(&id).unwrap();

        assert_eq!(session.mark_initialized(handshake(false)), Ok(false));
        assert!(session.is_initialized());
        assert!(!session.capabilities().wants_tool_list_changes());

        assert_eq!(session.mark_initialized(handshake(true)), Ok(true));
        assert!(session.is_initialized());
        assert!(session.capabilities().wants_tool_list_changes());
    }

    #[test]
    fn test_attach_is_exclusive() {
        let sessions = McpSessionManager::default();
        let id = sessions.create_session();
        let session = sessions.get_session(&id).unwrap();

        assert!(session.attach());
        assert!(!session.attach());
        session.detach();
        assert!(session.attach());
    }

    #[tokio::test]
    async fn test_notify_tools_changed_respects_capabilities() {
        let sessions = McpSessionManager::default();
        let wants = sessions.create_session();
        let ignores = sessions.create_session();
        let uninitialized = sessions.create_session();

        sessions
            .get_session(&wants)
            .unwrap()
            .mark_initialized(handshake(true))
            .unwrap();
        sessions
            .get_session(&ignores)
            .unwrap()
            .mark_initialized(handshake(false))
            .unwrap();

        assert_eq!(sessions.notify_tools_changed(), 1);

        let event = sessions
            .get_session(&wants)
            .unwrap()
            .queue()
            .recv()
            .await
            .unwrap();
        assert_eq!(event.payload()["method"], "notifications/tools/list_changed");
        assert!(sessions.get_session(&ignores).unwrap().queue().is_empty());
        assert!(sessions.get_session(&uninitialized).unwrap().queue().is_empty());
    }

    #[test]
    fn test_close_session_overflow_removes_session() {
        let sessions = McpSessionManager::new(QueueSettings {
            capacity: 1,
            overflow_policy: OverflowPolicy::CloseSession,
        });
        let id = sessions.create_session();
        let event = || McpEvent::Response(JsonRpcResponse::success(json!(1), json!({})));

        sessions.enqueue(&id, event()).unwrap();
        assert_eq!(
            sessions.enqueue(&id, event()),
            Err(McpError::QueueOverflow(id.clone()))
        );
        assert!(!sessions.session_exists(&id));
    }

    #[test]
    fn test_cleanup_stale_skips_attached() {
        let sessions = McpSessionManager::default();
        let detached = sessions.create_session();
        let attached = sessions.create_session();
        sessions.get_session(&attached).unwrap().attach();

        assert_eq!(sessions.cleanup_stale(Duration::ZERO), 1);
        assert!(!sessions.session_exists(&detached));
        assert!(sessions.session_exists(&attached));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_removes_stale_detached_sessions() {
        let sessions = McpSessionManager::default();
        let detached = sessions.create_session();
        let attached = sessions.create_session();
        sessions.get_session(&attached).unwrap().attach();

        let reaper = sessions.spawn_reaper(Duration::from_secs(60), Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(250)).await;
        assert!(sessions.session_exists(&detached));

        tokio::time::sleep(Duration::from_secs(70)).await;
        tokio::task::yield_now().await;
        assert!(!sessions.session_exists(&detached));
        assert!(sessions.session_exists(&attached));

        reaper.abort();
    }

    #[test]
    fn test_close_all() {
        let sessions = McpSessionManager::default();
        let id = sessions.create_session();
        let handle = sessions.get_session(&id).unwrap();
        sessions.create_session();

        assert_eq!(sessions.close_all(), 2);
        assert_eq!(sessions.session_count(), 0);
        assert!(handle.is_closed());
    }
}
