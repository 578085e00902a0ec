//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the cluster core to external systems:
//! - `postgres` - Node table, mailbox and settings in the shared database
//! - `memory` - In-process stand-ins for tests and single-node runs
//! - `auth` - JWT token verification and a mock authenticator
//! - `rate_limiter` - Per-host login attempt limiting
//! - `storage` - Local node id file
//! - `websocket` - Client connections over axum WebSockets

pub mod auth;
pub mod memory;
pub mod postgres;
pub mod rate_limiter;
pub mod storage;
pub mod websocket;

pub use auth::{JwtAuthenticator, MockAuthenticator};
pub use memory::{
    InMemoryAccessCache, InMemoryClusterStore, InMemorySchemaCache, InMemorySettingsStore,
};
pub use postgres::{PostgresNodeEventStore, PostgresNodeRepository, PostgresSettingsStore};
pub use rate_limiter::InMemoryLoginRateLimiter;
pub use storage::{FileNodeIdStore, InMemoryNodeIdStore};
pub use websocket::websocket_router;
