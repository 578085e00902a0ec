//! Node entity: one running server process in the cluster.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{NodeId, Timestamp};

/// A registered cluster node as stored in the shared node table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub hostname: String,
    pub is_master: bool,
    pub last_check_in: Timestamp,
    pub started_at: Timestamp,
    pub stat_sessions: i32,
    pub stat_memory_mb: i32,
    pub running: bool,
}

impl Node {
    /// Creates the row for a node seen for the first time.
    ///
    /// New nodes never start as master; they have to win an election.
    pub fn register(id: NodeId, name: impl Into<String>, hostname: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            hostname: hostname.into(),
            is_master: false,
            last_check_in: now,
            started_at: now,
            stat_sessions: 0,
            stat_memory_mb: 0,
            running: true,
        }
    }

    /// Sequential display name for the next node, given the current node count.
    pub fn display_name(existing_nodes: i64) -> String {
        format!("node{}", existing_nodes + 1)
    }
}

/// Liveness data written on every heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCheckIn {
    pub hostname: String,
    pub sessions: i32,
    pub memory_mb: i32,
    pub at: Timestamp,
}
