//! Stream writer and session lifecycle.
//!
//! Opening a stream creates the session, claims its writer slot and queues
//! the `connected` event. The returned stream yields queued events until the
//! session is removed. The [`SessionGuard`] it owns removes the session when
//! the stream is dropped, which covers client disconnects and cancellation
//! as well as normal termination.

use futures::stream::{self, Stream};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::McpError;
use super::event::McpEvent;
use super::session::{McpSession, McpSessionManager, SessionId};

/// Exclusive writer handle on a session.
///
/// Dropping the guard detaches the writer and removes the session.
pub struct SessionGuard {
    sessions: McpSessionManager,
    session: Arc<McpSession>,
}

impl SessionGuard {
    /// Attach a writer to an existing session.
    pub fn attach(sessions: &McpSessionManager, id: &str) -> Result<Self, McpError> {
        let session = sessions
            .get_session(id)
            .ok_or_else(|| McpError::SessionNotFound(id.to_string()))?;
        if !session.attach() {
            return Err(McpError::StreamAlreadyAttached(id.to_string()));
        }
        Ok(Self {
            sessions: sessions.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<McpSession> {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.detach();
        if self.sessions.remove_session(&self.session.id) {
            info!("MCP: SSE stream closed for session {}", self.session.id);
        }
    }
}

/// Create a session and return its id with the event stream for it.
///
/// The first item of the stream is always [`McpEvent::Connected`].
pub fn open_session_stream(
    sessions: &McpSessionManager,
) -> Result<(SessionId, impl Stream<Item = McpEvent> + Send + 'static), McpError> {
    let id = sessions.create_session();
    let guard = match SessionGuard::attach(sessions, &id) {
        Ok(guard) => guard,
        Err(e) => {
            sessions.remove_session(&id);
            return Err(e);
        }
    };

    guard
        .session()
        .send(McpEvent::Connected {
            session_id: id.clone(),
        })
        .map_err(|_| McpError::SessionNotFound(id.clone()))?;

    Ok((id, session_events(guard)))
}

/// Drain the guarded session's queue, one item per queued event.
pub fn session_events(guard: SessionGuard) -> impl Stream<Item = McpEvent> + Send + 'static {
    stream::unfold(guard, |guard| async move {
        let event = guard.session().queue().recv().await?;
        debug!(
            "MCP: Writing {} event to session {}",
            event.kind(),
            guard.session_id()
        );
        Some((event, guard))
    })
}
