//! WebSocket transport for client connections.
//!
//! - [`messages`] - request/response/push frame types
//! - [`transaction`] - authentication and per-frame request execution
//! - [`handler`] - axum upgrade handler, read loop and writer task
//!
//! Routing of pushes to connections is done by the application hub; this
//! module only moves frames between sockets and client queues.

pub mod handler;
pub mod messages;
pub mod transaction;

pub use handler::{websocket_router, ws_handler, ConnectParams};
pub use messages::{ProtocolError, RequestFrame, ResponseFrame};
pub use transaction::{FrameOutcome, Session};
