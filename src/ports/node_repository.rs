//! NodeRepository port - access to the shared node table.
//!
//! The node table is one of only two pieces of state shared between
//! processes (the other is the mailbox, see `NodeEventStore`). Liveness and
//! mastership are decided purely from what this table says.

use async_trait::async_trait;

use crate::domain::cluster::{MasterClaim, Node, NodeCheckIn};
use crate::domain::foundation::{DomainError, NodeId, Timestamp};

/// Port for reading and updating cluster node rows.
///
/// # Contract
///
/// - `reset_on_startup` must clear the master flag and purge the node's
///   mailbox in one transaction, so a restarted node never resumes with a
///   stale "I'm master" flag or stale queued events.
/// - `request_master_role` must be a single atomic check-and-flip. When two
///   nodes call it concurrently against the same stale master, exactly one
///   may observe `MasterClaim::Granted`.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Fetch a node by id.
    async fn find(&self, id: &NodeId) -> Result<Option<Node>, DomainError>;

    /// List every registered node.
    async fn list(&self) -> Result<Vec<Node>, DomainError>;

    /// Count registered nodes (used for sequential display names).
    async fn count(&self) -> Result<i64, DomainError>;

    /// Insert a node seen for the first time.
    async fn insert(&self, node: &Node) -> Result<(), DomainError>;

    /// Reset transient state of a known node and purge its queued events.
    async fn reset_on_startup(
        &self,
        id: &NodeId,
        hostname: &str,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Write heartbeat data for a node.
    async fn check_in(&self, id: &NodeId, check_in: &NodeCheckIn) -> Result<(), DomainError>;

    /// Check-in time of the current master, `None` if no node is master.
    async fn master_check_in(&self) -> Result<Option<Timestamp>, DomainError>;

    /// Atomically claim the master role if the current master is stale.
    async fn request_master_role(
        &self,
        id: &NodeId,
        missing_after_secs: i64,
    ) -> Result<MasterClaim, DomainError>;

    /// Mark a node as stopped and release its master flag.
    async fn shut_down(&self, id: &NodeId) -> Result<(), DomainError>;
}
