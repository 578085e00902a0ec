//! NodeEventStore port - the durable per-node mailbox.
//!
//! ## Delivery Semantics
//!
//! 1. Producers insert one row per target node
//! 2. The target's poller reads its rows in id order
//! 3. Rows are deleted only after their handler succeeded
//!
//! A crash between apply and delete re-delivers the event, so every handler
//! must be idempotent. Rows are never read by a node they are not addressed to.

use async_trait::async_trait;

use crate::domain::cluster::NodeEventContent;
use crate::domain::foundation::{DomainError, NodeId};

/// A raw mailbox row, not yet decoded.
///
/// Decoding is left to the consumer so that a malformed payload surfaces as
/// an event-apply failure rather than a storage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxRow {
    pub id: i64,
    pub target: NodeId,
    pub content: String,
    pub payload: Vec<u8>,
}

/// Port for the node event mailbox.
#[async_trait]
pub trait NodeEventStore: Send + Sync {
    /// Insert one event per target node.
    async fn enqueue(&self, targets: &[NodeId], content: &NodeEventContent) -> Result<(), DomainError>;

    /// All rows addressed to `node`, ordered by id.
    async fn fetch_pending(&self, node: &NodeId) -> Result<Vec<MailboxRow>, DomainError>;

    /// Delete applied rows. Returns the number of rows removed.
    async fn delete(&self, ids: &[i64]) -> Result<u64, DomainError>;
}
