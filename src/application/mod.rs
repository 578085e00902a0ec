//! Application layer - node lifecycle, event propagation and client fan-out.
//!
//! This layer orchestrates the cluster use cases over the ports:
//!
//! - `node_registry` / `election` / `runtime` - node row, heartbeat, master role
//! - `event_bus` / `event_processor` - durable node event mailbox
//! - `hub` - in-process registry of connected clients
//! - `scheduler` - periodic jobs, restarted on role changes
//!
//! All of it hangs off one [`AppContext`] built at startup.

mod context;
mod dispatcher;
pub mod election;
pub mod event_bus;
pub mod event_processor;
pub mod hub;
pub mod node_registry;
mod runtime;
pub mod scheduler;
mod signals;

pub use context::{AppContext, AppContextBuilder};
pub use dispatcher::ClusterRequestDispatcher;
pub use election::check_master;
pub use event_bus::Delivery;
pub use event_processor::{apply_event, process_events};
pub use hub::{ClientHandle, Hub, HubHandle, Outbound, PushOutcome};
pub use node_registry::{check_in_node, local_hostname, setup_node, shutdown_node};
pub use runtime::ClusterRuntime;
pub use scheduler::{NodeSweepJob, ScheduledJob, Scheduler};
pub use signals::{NodeState, SchedulerSignal, ShutdownSignal};
