//! In-memory Node Id Storage Adapter

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, NodeId};
use crate::ports::NodeIdStore;

/// Keeps the node id for the lifetime of the value.
#[derive(Debug, Default)]
pub struct InMemoryNodeIdStore {
    id: RwLock<Option<NodeId>>,
}

impl InMemoryNodeIdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `id`, as after a previous boot.
    pub fn with_id(id: NodeId) -> Self {
        Self {
            id: RwLock::new(Some(id)),
        }
    }
}

#[async_trait]
impl NodeIdStore for InMemoryNodeIdStore {
    async fn load(&self) -> Result<Option<NodeId>, DomainError> {
        Ok(*self.id.read().await)
    }

    async fn save(&self, id: &NodeId) -> Result<(), DomainError> {
        *self.id.write().await = Some(*id);
        Ok(())
    }
}
