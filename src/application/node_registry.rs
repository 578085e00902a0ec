//! Node registration, heartbeat and shutdown.

use sysinfo::System;

use crate::domain::cluster::{Node, NodeCheckIn};
use crate::domain::foundation::{DomainError, NodeId, Timestamp};
use crate::ports::{NodeIdStore, NodeRepository};

use super::AppContext;

/// Registers this process as a cluster node.
///
/// The node id is loaded from the local store, or generated and saved on
/// first boot. A node unseen by the database gets a fresh row named
/// `node<N>`; a known node has its transient state reset and any mail left
/// over from its previous run purged.
pub async fn setup_node(
    nodes: &dyn NodeRepository,
    ids: &dyn NodeIdStore,
    hostname: &str,
) -> Result<NodeId, DomainError> {
    let node_id = match ids.load().await? {
        Some(id) => id,
        None => {
            let id = NodeId::new();
            ids.save(&id).await?;
            tracing::info!(node_id = %id, "Generated new node id");
            id
        }
    };

    let now = Timestamp::now();
    match nodes.find(&node_id).await? {
        Some(node) => {
            nodes.reset_on_startup(&node_id, hostname, now).await?;
            tracing::info!(node_id = %node_id, name = %node.name, "Node restarted");
        }
        None => {
            let count = nodes.count().await?;
            let node = Node::register(node_id, Node::display_name(count), hostname, now);
            nodes.insert(&node).await?;
            tracing::info!(node_id = %node_id, name = %node.name, "Node registered");
        }
    }

    Ok(node_id)
}

/// Writes this node's liveness row.
pub async fn check_in_node(ctx: &AppContext) -> Result<(), DomainError> {
    let check_in = NodeCheckIn {
        hostname: ctx.hostname.clone(),
        sessions: i32::try_from(ctx.hub.session_count()).unwrap_or(i32::MAX),
        memory_mb: resident_memory_mb(),
        at: Timestamp::now(),
    };

    ctx.nodes.check_in(&ctx.node_id, &check_in).await?;
    tracing::debug!(
        node_id = %ctx.node_id,
        sessions = check_in.sessions,
        memory_mb = check_in.memory_mb,
        "Node checked in"
    );
    Ok(())
}

/// Marks this node as stopped and gives up the master role.
///
/// Releasing the flag lets another node claim mastership on its next
/// heartbeat instead of waiting for this node to go stale.
pub async fn shutdown_node(ctx: &AppContext) -> Result<(), DomainError> {
    ctx.nodes.shut_down(&ctx.node_id).await?;
    let was_master = ctx.state.set_master(false);
    tracing::info!(node_id = %ctx.node_id, was_master, "Node shut down");
    Ok(())
}

/// Hostname reported in check-ins.
pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Resident set size of this process in MB, 0 where unavailable.
pub fn resident_memory_mb() -> i32 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return 0;
    }
    system
        .process(pid)
        .map(|process| i32::try_from(process.memory() / (1024 * 1024)).unwrap_or(i32::MAX))
        .unwrap_or(0)
}
