//! Built-in request handlers.
//!
//! Only the cluster status resource lives in this crate. Deployments that
//! serve application resources plug in their own `RequestDispatcher`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode, Identity, NodeId};
use crate::ports::{ClientRequest, NodeRepository, RequestDispatcher};

/// Serves the `cluster` resource.
///
/// | action  | access | result                     |
/// |---------|--------|----------------------------|
/// | `nodes` | admin  | every registered node      |
/// | `node`  | any    | the node serving the client |
pub struct ClusterRequestDispatcher {
    nodes: Arc<dyn NodeRepository>,
    node_id: NodeId,
}

impl ClusterRequestDispatcher {
    pub fn new(nodes: Arc<dyn NodeRepository>, node_id: NodeId) -> Self {
        Self { nodes, node_id }
    }

    async fn list_nodes(&self, identity: &Identity) -> Result<Value, DomainError> {
        if !identity.admin {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Listing cluster nodes requires admin rights",
            ));
        }
        let nodes = self.nodes.list().await?;
        to_value(&nodes)
    }

    async fn own_node(&self) -> Result<Value, DomainError> {
        let node = self.nodes.find(&self.node_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::NodeNotFound, "This node is not registered")
                .with_detail("node_id", self.node_id.to_string())
        })?;
        to_value(&node)
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::new(ErrorCode::InternalError, format!("Failed to serialize response: {}", e)))
}

#[async_trait]
impl RequestDispatcher for ClusterRequestDispatcher {
    async fn dispatch(&self, identity: &Identity, request: &ClientRequest) -> Result<Value, DomainError> {
        match (request.resource.as_str(), request.action.as_str()) {
            ("cluster", "nodes") => self.list_nodes(identity).await,
            ("cluster", "node") => self.own_node().await,
            (resource, action) => Err(DomainError::new(
                ErrorCode::UnknownResource,
                format!("Unknown request {}/{}", resource, action),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryClusterStore;
    use crate::domain::cluster::Node;
    use crate::domain::foundation::{LoginId, Timestamp};

    fn identity(admin: bool) -> Identity {
        Identity {
            login_id: LoginId::new(5),
            admin,
            no_auth: false,
        }
    }

    async fn setup() -> (ClusterRequestDispatcher, NodeId) {
        let store = Arc::new(InMemoryClusterStore::new());
        let id = NodeId::new();
        store
            .insert(&Node::register(id, "node1", "host-a", Timestamp::now()))
            .await
            .unwrap();
        store
            .insert(&Node::register(NodeId::new(), "node2", "host-b", Timestamp::now()))
            .await
            .unwrap();
        (ClusterRequestDispatcher::new(store, id), id)
    }

    #[tokio::test]
    async fn admin_lists_all_nodes() {
        let (dispatcher, _) = setup().await;

        let result = dispatcher
            .dispatch(&identity(true), &ClientRequest::new("cluster", "nodes", Value::Null))
            .await
            .unwrap();

        assert_eq!(result.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn non_admin_cannot_list_nodes() {
        let (dispatcher, _) = setup().await;

        let err = dispatcher
            .dispatch(&identity(false), &ClientRequest::new("cluster", "nodes", Value::Null))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn node_action_returns_own_row() {
        let (dispatcher, id) = setup().await;

        let result = dispatcher
            .dispatch(&identity(false), &ClientRequest::new("cluster", "node", Value::Null))
            .await
            .unwrap();

        assert_eq!(result["name"], "node1");
        assert_eq!(result["id"], serde_json::to_value(id).unwrap());
    }

    #[tokio::test]
    async fn unknown_resource_is_rejected() {
        let (dispatcher, _) = setup().await;

        let err = dispatcher
            .dispatch(&identity(true), &ClientRequest::new("schema", "get", Value::Null))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::UnknownResource);
    }
}
