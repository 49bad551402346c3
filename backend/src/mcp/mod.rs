//! MCP (Model Context Protocol) over Server-Sent Events.
//!
//! A client opens `GET /sse` and receives a `connected` event carrying its
//! session id. It then posts JSON-RPC requests to `/messages/{session_id}`;
//! each response is delivered on the stream in submission order and is also
//! returned in the HTTP body.
//!
//! ## Endpoints
//!
//! - `GET /sse` - Open the event stream and create a session
//! - `POST /messages/{session_id}` - Submit a JSON-RPC request
//! - `DELETE /messages/{session_id}` - Terminate a session
//!
//! ## Session Management
//!
//! A session lives exactly as long as its stream. Dropping the stream, for
//! any reason, removes the session, after which posts to its id fail with
//! 404.

pub mod error;
pub mod event;
pub mod handler;
pub mod queue;
pub mod session;
pub mod stream;

pub use error::{McpError, ProtocolError};
pub use event::McpEvent;
pub use handler::{parse_request, McpHandler};
pub use queue::{EventQueue, OverflowPolicy, QueueError};
pub use session::{McpSession, McpSessionManager, QueueSettings, SessionId, SessionState};
pub use stream::{open_session_stream, SessionGuard};
