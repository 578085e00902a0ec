//! Node background loop: heartbeat, election and mailbox polling.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::election::check_master;
use super::event_processor::process_events;
use super::node_registry::check_in_node;
use super::AppContext;

/// Drives the periodic cluster duties of one node.
///
/// Both intervals share one task, so a slow database delays the next poll
/// rather than piling up concurrent cycles. Errors are logged and the duty
/// is retried on its next tick.
pub struct ClusterRuntime {
    ctx: Arc<AppContext>,
}

impl ClusterRuntime {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut heartbeat = time::interval(self.ctx.cluster.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poll = time::interval(self.ctx.cluster.event_poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            node_id = %self.ctx.node_id,
            heartbeat_secs = self.ctx.cluster.heartbeat_interval_secs,
            poll_secs = self.ctx.cluster.event_poll_interval_secs,
            "Cluster runtime started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = heartbeat.tick() => self.heartbeat().await,
                _ = poll.tick() => self.poll().await,
            }
        }

        tracing::info!(node_id = %self.ctx.node_id, "Cluster runtime stopped");
    }

    /// One heartbeat: check in, then claim mastership if the master is missing.
    pub async fn heartbeat(&self) {
        if let Err(e) = check_in_node(&self.ctx).await {
            tracing::error!(node_id = %self.ctx.node_id, error = %e, "Node check-in failed");
            return;
        }
        if let Err(e) = check_master(&self.ctx).await {
            tracing::error!(node_id = %self.ctx.node_id, error = %e, "Master check failed");
        }
    }

    /// One mailbox poll.
    pub async fn poll(&self) {
        match process_events(&self.ctx).await {
            Ok(0) => {}
            Ok(applied) => tracing::debug!(node_id = %self.ctx.node_id, applied, "Node events applied"),
            Err(e) => tracing::warn!(node_id = %self.ctx.node_id, error = %e, "Node event cycle aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryClusterStore;
    use crate::adapters::storage::InMemoryNodeIdStore;
    use crate::application::node_registry::setup_node;
    use crate::application::signals::ShutdownSignal;
    use std::time::Duration;

    #[tokio::test]
    async fn first_heartbeat_and_poll_make_lone_node_master() {
        let store = Arc::new(InMemoryClusterStore::new());
        let node_id = setup_node(store.as_ref(), &InMemoryNodeIdStore::new(), "host-a")
            .await
            .unwrap();
        let ctx = AppContext::builder(node_id).cluster_store(store.clone()).build();
        let runtime = ClusterRuntime::new(ctx.clone());

        runtime.heartbeat().await;
        assert!(!ctx.state.is_master());

        runtime.poll().await;
        assert!(ctx.state.is_master());
        assert_eq!(store.pending_count(&node_id).await, 0);
        assert_eq!(ctx.scheduler.generation(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let shutdown = ShutdownSignal::new();
        let ctx = AppContext::builder(crate::domain::foundation::NodeId::new())
            .shutdown(shutdown.clone())
            .build();

        let handle = tokio::spawn(ClusterRuntime::new(ctx).run(shutdown.subscribe()));
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
    }
}
