//! In-memory node table and node mailbox.
//!
//! Both tables live behind a single mutex so that the master claim is as
//! atomic as the database procedure it stands in for.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::cluster::{master_is_stale, MasterClaim, Node, NodeCheckIn, NodeEventContent};
use crate::domain::foundation::{DomainError, ErrorCode, NodeId, Timestamp};
use crate::ports::{MailboxRow, NodeEventStore, NodeRepository};

#[derive(Debug, Default)]
struct Tables {
    nodes: HashMap<NodeId, Node>,
    /// Mailbox rows keyed by id; BTreeMap keeps them in insertion order.
    mailbox: BTreeMap<i64, MailboxRow>,
    next_event_id: i64,
}

impl Tables {
    fn push_event(&mut self, target: NodeId, content: &NodeEventContent) -> Result<(), DomainError> {
        let payload = content
            .encode_payload()
            .map_err(|e| DomainError::new(ErrorCode::EventDecodeFailed, e.to_string()))?;
        self.next_event_id += 1;
        let id = self.next_event_id;
        self.mailbox.insert(
            id,
            MailboxRow {
                id,
                target,
                content: content.tag().to_string(),
                payload,
            },
        );
        Ok(())
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut Node, DomainError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::NodeNotFound, format!("Node not found: {}", id)))
    }
}

/// In-memory implementation of `NodeRepository` and `NodeEventStore`.
///
/// Share one instance (behind an `Arc`) between several application
/// contexts to simulate a cluster in tests.
#[derive(Debug, Default)]
pub struct InMemoryClusterStore {
    tables: Mutex<Tables>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Number of mailbox rows addressed to `node`.
    pub async fn pending_count(&self, node: &NodeId) -> usize {
        self.tables
            .lock()
            .await
            .mailbox
            .values()
            .filter(|row| row.target == *node)
            .count()
    }

    /// Inserts a raw mailbox row, bypassing encoding.
    pub async fn push_raw(&self, target: NodeId, content: &str, payload: &[u8]) -> i64 {
        let mut tables = self.tables.lock().await;
        tables.next_event_id += 1;
        let id = tables.next_event_id;
        tables.mailbox.insert(
            id,
            MailboxRow {
                id,
                target,
                content: content.to_string(),
                payload: payload.to_vec(),
            },
        );
        id
    }

    /// Nodes currently flagged as master.
    pub async fn masters(&self) -> Vec<NodeId> {
        self.tables
            .lock()
            .await
            .nodes
            .values()
            .filter(|n| n.is_master)
            .map(|n| n.id)
            .collect()
    }

    /// Forces the master flag, e.g. to seed a stale master.
    pub async fn set_master(&self, id: &NodeId, is_master: bool) -> Result<(), DomainError> {
        self.tables.lock().await.node_mut(id)?.is_master = is_master;
        Ok(())
    }
}

#[async_trait]
impl NodeRepository for InMemoryClusterStore {
    async fn find(&self, id: &NodeId) -> Result<Option<Node>, DomainError> {
        Ok(self.tables.lock().await.nodes.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Node>, DomainError> {
        let mut nodes: Vec<Node> = self.tables.lock().await.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    async fn count(&self) -> Result<i64, DomainError> {
        Ok(self.tables.lock().await.nodes.len() as i64)
    }

    async fn insert(&self, node: &Node) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        if tables.nodes.contains_key(&node.id) {
            return Err(DomainError::database(
                "Failed to insert node",
                format!("duplicate node id {}", node.id),
            ));
        }
        tables.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn reset_on_startup(&self, id: &NodeId, hostname: &str, now: Timestamp) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        let node = tables.node_mut(id)?;
        node.hostname = hostname.to_string();
        node.started_at = now;
        node.last_check_in = now;
        node.is_master = false;
        node.running = true;
        tables.mailbox.retain(|_, row| row.target != *id);
        Ok(())
    }

    async fn check_in(&self, id: &NodeId, check_in: &NodeCheckIn) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        let node = tables.node_mut(id)?;
        node.hostname = check_in.hostname.clone();
        node.stat_sessions = check_in.sessions;
        node.stat_memory_mb = check_in.memory_mb;
        node.last_check_in = check_in.at;
        node.running = true;
        Ok(())
    }

    async fn master_check_in(&self) -> Result<Option<Timestamp>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .nodes
            .values()
            .find(|n| n.is_master)
            .map(|n| n.last_check_in))
    }

    async fn request_master_role(&self, id: &NodeId, missing_after_secs: i64) -> Result<MasterClaim, DomainError> {
        let mut tables = self.tables.lock().await;
        tables.node_mut(id)?;

        let now = Timestamp::now();
        let current = tables.nodes.values().find(|n| n.is_master).map(|n| n.last_check_in);
        if !master_is_stale(current, now, missing_after_secs) {
            return Ok(MasterClaim::Rejected);
        }

        let mut others = Vec::new();
        for node in tables.nodes.values_mut() {
            node.is_master = node.id == *id;
            if node.is_master {
                node.last_check_in = now;
            } else {
                others.push(node.id);
            }
        }
        others.sort_by_key(|n| *n.as_uuid());

        for other in others {
            tables.push_event(other, &NodeEventContent::master_assigned(false))?;
        }
        tables.push_event(*id, &NodeEventContent::master_assigned(true))?;

        Ok(MasterClaim::Granted)
    }

    async fn shut_down(&self, id: &NodeId) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        let node = tables.node_mut(id)?;
        node.running = false;
        node.is_master = false;
        Ok(())
    }
}

#[async_trait]
impl NodeEventStore for InMemoryClusterStore {
    async fn enqueue(&self, targets: &[NodeId], content: &NodeEventContent) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        for target in targets {
            tables.push_event(*target, content)?;
        }
        Ok(())
    }

    async fn fetch_pending(&self, node: &NodeId) -> Result<Vec<MailboxRow>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .mailbox
            .values()
            .filter(|row| row.target == *node)
            .cloned()
            .collect())
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64, DomainError> {
        let mut tables = self.tables.lock().await;
        let removed = ids.iter().filter(|id| tables.mailbox.remove(*id).is_some()).count();
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::LoginPayload;
    use crate::domain::foundation::LoginId;
    use std::sync::Arc;

    async fn store_with_nodes(n: usize) -> (InMemoryClusterStore, Vec<NodeId>) {
        let store = InMemoryClusterStore::new();
        let mut ids = Vec::new();
        for i in 0..n {
            let id = NodeId::new();
            store
                .insert(&Node::register(id, Node::display_name(i as i64), "host", Timestamp::now()))
                .await
                .unwrap();
            ids.push(id);
        }
        (store, ids)
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let (store, ids) = store_with_nodes(1).await;
        let dup = Node::register(ids[0], "again", "host", Timestamp::now());
        assert!(store.insert(&dup).await.is_err());
    }

    #[tokio::test]
    async fn mailbox_is_per_node_and_ordered() {
        let (store, ids) = store_with_nodes(2).await;
        let first = NodeEventContent::LoginDisabled(LoginPayload { login_id: LoginId::new(1) });
        let second = NodeEventContent::TasksChanged;

        store.enqueue(&ids, &first).await.unwrap();
        store.enqueue(&ids[..1], &second).await.unwrap();

        let rows = store.fetch_pending(&ids[0]).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id < rows[1].id);
        assert_eq!(rows[0].content, "loginDisabled");
        assert_eq!(rows[1].content, "tasksChanged");
        assert_eq!(store.fetch_pending(&ids[1]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_removed_rows() {
        let (store, ids) = store_with_nodes(1).await;
        store.enqueue(&ids, &NodeEventContent::TasksChanged).await.unwrap();
        let rows = store.fetch_pending(&ids[0]).await.unwrap();

        assert_eq!(store.delete(&[rows[0].id, 999]).await.unwrap(), 1);
        assert_eq!(store.pending_count(&ids[0]).await, 0);
    }

    #[tokio::test]
    async fn reset_on_startup_purges_mail_and_master_flag() {
        let (store, ids) = store_with_nodes(1).await;
        store.set_master(&ids[0], true).await.unwrap();
        store.enqueue(&ids, &NodeEventContent::TasksChanged).await.unwrap();

        store.reset_on_startup(&ids[0], "new-host", Timestamp::now()).await.unwrap();

        let node = store.find(&ids[0]).await.unwrap().unwrap();
        assert!(!node.is_master);
        assert!(node.running);
        assert_eq!(node.hostname, "new-host");
        assert_eq!(store.pending_count(&ids[0]).await, 0);
    }

    #[tokio::test]
    async fn claim_against_fresh_master_is_rejected() {
        let (store, ids) = store_with_nodes(2).await;
        store.set_master(&ids[0], true).await.unwrap();

        let claim = store.request_master_role(&ids[1], 180).await.unwrap();

        assert_eq!(claim, MasterClaim::Rejected);
        assert_eq!(store.masters().await, vec![ids[0]]);
        assert_eq!(store.pending_count(&ids[0]).await, 0);
    }

    #[tokio::test]
    async fn concurrent_claims_have_single_winner() {
        let (store, ids) = store_with_nodes(5).await;
        let store = Arc::new(store);

        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let store = store.clone();
                let id = *id;
                tokio::spawn(async move { store.request_master_role(&id, 180).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_granted() {
                granted += 1;
            }
        }

        assert_eq!(granted, 1);
        assert_eq!(store.masters().await.len(), 1);
    }

    #[tokio::test]
    async fn claim_for_unknown_node_fails() {
        let store = InMemoryClusterStore::new();
        let err = store.request_master_role(&NodeId::new(), 180).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NodeNotFound);
    }

    #[tokio::test]
    async fn shut_down_releases_master() {
        let (store, ids) = store_with_nodes(1).await;
        store.set_master(&ids[0], true).await.unwrap();

        store.shut_down(&ids[0]).await.unwrap();

        let node = store.find(&ids[0]).await.unwrap().unwrap();
        assert!(!node.running);
        assert!(store.masters().await.is_empty());
    }

    #[tokio::test]
    async fn check_in_marks_stopped_node_running() {
        let (store, ids) = store_with_nodes(1).await;
        store.shut_down(&ids[0]).await.unwrap();

        store
            .check_in(
                &ids[0],
                &NodeCheckIn {
                    hostname: "host".to_string(),
                    sessions: 2,
                    memory_mb: 64,
                    at: Timestamp::now(),
                },
            )
            .await
            .unwrap();

        let node = store.find(&ids[0]).await.unwrap().unwrap();
        assert!(node.running);
        assert_eq!(node.stat_sessions, 2);
    }
}
