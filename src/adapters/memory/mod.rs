//! In-memory adapters.
//!
//! Process-local implementations of the shared-state and collaborator ports.
//! `InMemoryClusterStore` emulates the node and mailbox tables (including
//! the atomic master claim) for tests and single-process runs. The cache
//! and settings adapters are the default local collaborators.

mod caches;
mod cluster_store;
mod settings_store;

pub use caches::{InMemoryAccessCache, InMemorySchemaCache, SchemaReload};
pub use cluster_store::InMemoryClusterStore;
pub use settings_store::InMemorySettingsStore;
