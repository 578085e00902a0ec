//! Process-local flags and signals shared by the background loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Local view of this node's role and the instance mode.
///
/// Both flags are only ever written by the event processor (and startup),
/// so readers may see a value one poll cycle old.
#[derive(Debug, Default)]
pub struct NodeState {
    master: AtomicBool,
    maintenance: AtomicBool,
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_master(&self) -> bool {
        self.master.load(Ordering::SeqCst)
    }

    /// Sets the master flag, returning the previous value.
    pub fn set_master(&self, master: bool) -> bool {
        self.master.swap(master, Ordering::SeqCst)
    }

    pub fn in_maintenance(&self) -> bool {
        self.maintenance.load(Ordering::SeqCst)
    }

    pub fn set_maintenance(&self, maintenance: bool) {
        self.maintenance.store(maintenance, Ordering::SeqCst);
    }
}

/// Restart signal for the scheduler.
///
/// Carries a generation counter; every restart request bumps it and the
/// scheduler restarts its jobs whenever it observes a change.
#[derive(Debug, Clone)]
pub struct SchedulerSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl SchedulerSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn restart(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for SchedulerSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide graceful shutdown trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        // An Err means the sender is gone, which only happens at teardown.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
