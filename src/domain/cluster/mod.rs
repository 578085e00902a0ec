//! Cluster domain: nodes, mailbox events, and hub events.

mod cluster_event;
mod election;
mod node;
mod node_event;

pub use cluster_event::{ClusterEvent, ClusterEventContent, DeviceClass, EventTarget};
pub use election::{master_is_stale, MasterClaim};
pub use node::{Node, NodeCheckIn};
pub use node_event::{
    CollectionUpdatedPayload, ConfigChangedPayload, ContentTag, EmptyPayload, EventDecodeError,
    LoginPayload, MasterAssignedPayload, NodeEvent, NodeEventContent, SchemaChangedPayload,
};
