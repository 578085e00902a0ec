//! PostgreSQL adapters - Database implementations for the shared-state ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresNodeRepository` - Node registry, heartbeat and master claim
//! - `PostgresNodeEventStore` - Per-node durable mailbox
//! - `PostgresSettingsStore` - Instance settings
//!
//! Schema objects are created by the embedded migrations in `migrations/`.

mod node_event_store;
mod node_repository;
mod settings_store;

pub use node_event_store::PostgresNodeEventStore;
pub use node_repository::PostgresNodeRepository;
pub use settings_store::PostgresSettingsStore;

/// Embedded migrations for the cluster schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
