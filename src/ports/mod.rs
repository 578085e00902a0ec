//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the cluster core and the outside world. Adapters implement these ports.
//!
//! ## Shared State Ports
//!
//! - `NodeRepository` - Node table, heartbeat, atomic master claim
//! - `NodeEventStore` - Durable per-node mailbox
//! - `SettingsStore` - Instance settings read on `configChanged`
//!
//! ## Local Collaborator Ports
//!
//! - `SchemaCache`, `AccessCache` - Caches renewed by node events
//! - `Authenticator` - Token and credential verification
//! - `LoginRateLimiter` - Per-host brute-force protection
//! - `RequestDispatcher` - Application request handlers
//! - `NodeIdStore` - Local persistence of the node identity

mod authenticator;
mod caches;
mod node_event_store;
mod node_id_store;
mod node_repository;
mod rate_limiter;
mod request_dispatcher;
mod settings_store;

pub use authenticator::Authenticator;
pub use caches::{AccessCache, SchemaCache};
pub use node_event_store::{MailboxRow, NodeEventStore};
pub use node_id_store::NodeIdStore;
pub use node_repository::NodeRepository;
pub use rate_limiter::{LoginLimits, LoginRateLimiter, RateLimitKey, RateLimitResult};
pub use request_dispatcher::{ClientRequest, RequestDispatcher};
pub use settings_store::{InstanceSettings, SettingsStore};
