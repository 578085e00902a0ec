//! Local cache ports refreshed by node event handlers.
//!
//! Schema and access caches are process-local. Every node re-derives them
//! from the same event stream; they are never replicated node-to-node.
//! Both reload operations must be safe to repeat because the event that
//! triggers them may be delivered more than once.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LoginId, ModuleId};

/// Port for the application schema cache.
#[async_trait]
pub trait SchemaCache: Send + Sync {
    /// Reload the schema of the given modules from the database.
    ///
    /// `new_version` signals that clients must fetch a new schema version
    /// (as opposed to a reload of unchanged definitions).
    async fn reload(&self, module_ids: &[ModuleId], new_version: bool) -> Result<(), DomainError>;
}

/// Port for the login access (permission) cache.
#[async_trait]
pub trait AccessCache: Send + Sync {
    /// Renew cached access for one login, or for every login when `None`.
    async fn renew(&self, login_id: Option<LoginId>) -> Result<(), DomainError>;
}
