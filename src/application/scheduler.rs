//! Periodic job scheduler.
//!
//! Every job runs on its own interval inside a `JoinSet`. A restart signal
//! (master role change, `tasksChanged`) aborts all job loops and starts them
//! again, re-evaluating which jobs this node should run. Master-only jobs
//! are started only while this node holds the master role.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::cluster::master_is_stale;
use crate::domain::foundation::{DomainError, Timestamp};

use super::AppContext;

/// A job run periodically by the scheduler.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    fn interval(&self) -> Duration;

    /// Run only on the master node.
    fn master_only(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &AppContext) -> Result<(), DomainError>;
}

pub struct Scheduler {
    ctx: Arc<AppContext>,
    jobs: Vec<Arc<dyn ScheduledJob>>,
}

impl Scheduler {
    pub fn new(ctx: Arc<AppContext>, jobs: Vec<Arc<dyn ScheduledJob>>) -> Self {
        Self { ctx, jobs }
    }

    /// Scheduler with the built-in cluster jobs.
    pub fn with_default_jobs(ctx: Arc<AppContext>) -> Self {
        Self::new(ctx, vec![Arc::new(NodeSweepJob)])
    }

    /// Run until shutdown, restarting jobs on every scheduler signal.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut restart = self.ctx.scheduler.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let mut running = self.start_jobs();

            tokio::select! {
                _ = shutdown.changed() => {
                    running.shutdown().await;
                    if *shutdown.borrow() {
                        break;
                    }
                }
                changed = restart.changed() => {
                    running.shutdown().await;
                    if changed.is_err() {
                        break;
                    }
                    tracing::info!(
                        node_id = %self.ctx.node_id,
                        generation = *restart.borrow_and_update(),
                        "Restarting scheduled jobs"
                    );
                }
            }
        }

        tracing::info!(node_id = %self.ctx.node_id, "Scheduler stopped");
    }

    fn start_jobs(&self) -> JoinSet<()> {
        let is_master = self.ctx.state.is_master();
        let mut set = JoinSet::new();

        for job in self.jobs.iter().filter(|job| is_master || !job.master_only()) {
            let job = Arc::clone(job);
            let ctx = Arc::clone(&self.ctx);
            set.spawn(async move { run_job(ctx, job).await });
        }

        tracing::debug!(node_id = %self.ctx.node_id, is_master, jobs = set.len(), "Scheduled jobs started");
        set
    }
}

async fn run_job(ctx: Arc<AppContext>, job: Arc<dyn ScheduledJob>) {
    let mut interval = time::interval(job.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; jobs start one period after (re)start.
    interval.tick().await;

    loop {
        interval.tick().await;
        if let Err(e) = job.run(&ctx).await {
            tracing::error!(node_id = %ctx.node_id, job = job.name(), error = %e, "Scheduled job failed");
        }
    }
}

/// Marks nodes that stopped checking in as no longer running.
///
/// Master-only. Uses the same staleness threshold as master election, so a
/// node is swept exactly when it could no longer hold the master role.
#[derive(Debug, Default)]
pub struct NodeSweepJob;

#[async_trait]
impl ScheduledJob for NodeSweepJob {
    fn name(&self) -> &str {
        "node_sweep"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn master_only(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &AppContext) -> Result<(), DomainError> {
        let now = Timestamp::now();
        let missing_after = ctx.cluster.master_missing_after();

        for node in ctx.nodes.list().await? {
            if node.id == ctx.node_id || !node.running || node.is_master {
                continue;
            }
            if master_is_stale(Some(node.last_check_in), now, missing_after) {
                ctx.nodes.shut_down(&node.id).await?;
                tracing::warn!(
                    node_id = %ctx.node_id,
                    stale_node = %node.id,
                    name = %node.name,
                    "Marked unresponsive node as stopped"
                );
            }
        }
        Ok(())
    }
}
