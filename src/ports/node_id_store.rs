//! NodeIdStore port - local persistence of this process's node identity.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, NodeId};

/// Persists the node id outside the database so it survives restarts.
#[async_trait]
pub trait NodeIdStore: Send + Sync {
    /// Load the stored node id, `None` on first boot.
    async fn load(&self) -> Result<Option<NodeId>, DomainError>;

    /// Persist a newly generated node id.
    async fn save(&self, id: &NodeId) -> Result<(), DomainError>;
}
