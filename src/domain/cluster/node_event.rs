//! Durable node events exchanged through the per-node mailbox table.
//!
//! A mailbox row carries a content tag and an opaque JSON payload. The tag
//! alone decides which payload schema applies, so decoding goes through
//! [`ContentTag`] first and then deserializes the payload into the matching
//! variant of [`NodeEventContent`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::foundation::{LoginId, ModuleId, NodeId};

/// Content tags as stored in the `content` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentTag {
    ConfigChanged,
    SchemaChanged,
    LoginDisabled,
    LoginReauthorized,
    LoginReauthorizedAll,
    MasterAssigned,
    TasksChanged,
    CollectionUpdated,
    ShutdownTriggered,
}

impl ContentTag {
    pub const ALL: [ContentTag; 9] = [
        ContentTag::ConfigChanged,
        ContentTag::SchemaChanged,
        ContentTag::LoginDisabled,
        ContentTag::LoginReauthorized,
        ContentTag::LoginReauthorizedAll,
        ContentTag::MasterAssigned,
        ContentTag::TasksChanged,
        ContentTag::CollectionUpdated,
        ContentTag::ShutdownTriggered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTag::ConfigChanged => "configChanged",
            ContentTag::SchemaChanged => "schemaChanged",
            ContentTag::LoginDisabled => "loginDisabled",
            ContentTag::LoginReauthorized => "loginReauthorized",
            ContentTag::LoginReauthorizedAll => "loginReauthorizedAll",
            ContentTag::MasterAssigned => "masterAssigned",
            ContentTag::TasksChanged => "tasksChanged",
            ContentTag::CollectionUpdated => "collectionUpdated",
            ContentTag::ShutdownTriggered => "shutdownTriggered",
        }
    }
}

impl fmt::Display for ContentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentTag {
    type Err = EventDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| EventDecodeError::UnknownContent(s.to_string()))
    }
}

/// Errors raised while encoding or decoding a mailbox row.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event content: {0}")]
    UnknownContent(String),

    #[error("invalid payload for {tag}: {source}")]
    InvalidPayload {
        tag: ContentTag,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode payload for {tag}: {source}")]
    EncodeFailed {
        tag: ContentTag,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChangedPayload {
    pub switch_to_maintenance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaChangedPayload {
    pub new_version: bool,
    pub module_ids: Vec<ModuleId>,
}

/// Payload shared by `loginDisabled` and `loginReauthorized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub login_id: LoginId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterAssignedPayload {
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionUpdatedPayload {
    pub collection_id: uuid::Uuid,
    /// Logins to notify; empty means every connected login.
    #[serde(default)]
    pub login_ids: Vec<LoginId>,
}

/// Payload for tags that carry no data (`{}` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// Typed content of a node event, one variant per content tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEventContent {
    ConfigChanged(ConfigChangedPayload),
    SchemaChanged(SchemaChangedPayload),
    LoginDisabled(LoginPayload),
    LoginReauthorized(LoginPayload),
    LoginReauthorizedAll,
    MasterAssigned(MasterAssignedPayload),
    TasksChanged,
    CollectionUpdated(CollectionUpdatedPayload),
    ShutdownTriggered,
}

impl NodeEventContent {
    pub fn tag(&self) -> ContentTag {
        match self {
            NodeEventContent::ConfigChanged(_) => ContentTag::ConfigChanged,
            NodeEventContent::SchemaChanged(_) => ContentTag::SchemaChanged,
            NodeEventContent::LoginDisabled(_) => ContentTag::LoginDisabled,
            NodeEventContent::LoginReauthorized(_) => ContentTag::LoginReauthorized,
            NodeEventContent::LoginReauthorizedAll => ContentTag::LoginReauthorizedAll,
            NodeEventContent::MasterAssigned(_) => ContentTag::MasterAssigned,
            NodeEventContent::TasksChanged => ContentTag::TasksChanged,
            NodeEventContent::CollectionUpdated(_) => ContentTag::CollectionUpdated,
            NodeEventContent::ShutdownTriggered => ContentTag::ShutdownTriggered,
        }
    }

    /// Serializes the payload for the `payload` column.
    pub fn encode_payload(&self) -> Result<Vec<u8>, EventDecodeError> {
        let tag = self.tag();
        let encoded = match self {
            NodeEventContent::ConfigChanged(p) => serde_json::to_vec(p),
            NodeEventContent::SchemaChanged(p) => serde_json::to_vec(p),
            NodeEventContent::LoginDisabled(p) | NodeEventContent::LoginReauthorized(p) => {
                serde_json::to_vec(p)
            }
            NodeEventContent::MasterAssigned(p) => serde_json::to_vec(p),
            NodeEventContent::CollectionUpdated(p) => serde_json::to_vec(p),
            NodeEventContent::LoginReauthorizedAll
            | NodeEventContent::TasksChanged
            | NodeEventContent::ShutdownTriggered => serde_json::to_vec(&EmptyPayload {}),
        };
        encoded.map_err(|source| EventDecodeError::EncodeFailed { tag, source })
    }

    /// Rebuilds typed content from a mailbox row.
    pub fn decode(content: &str, payload: &[u8]) -> Result<Self, EventDecodeError> {
        let tag: ContentTag = content.parse()?;
        let invalid = |source| EventDecodeError::InvalidPayload { tag, source };

        let decoded = match tag {
            ContentTag::ConfigChanged => {
                NodeEventContent::ConfigChanged(serde_json::from_slice(payload).map_err(invalid)?)
            }
            ContentTag::SchemaChanged => {
                NodeEventContent::SchemaChanged(serde_json::from_slice(payload).map_err(invalid)?)
            }
            ContentTag::LoginDisabled => {
                NodeEventContent::LoginDisabled(serde_json::from_slice(payload).map_err(invalid)?)
            }
            ContentTag::LoginReauthorized => NodeEventContent::LoginReauthorized(
                serde_json::from_slice(payload).map_err(invalid)?,
            ),
            ContentTag::LoginReauthorizedAll => {
                let _: EmptyPayload = serde_json::from_slice(payload).map_err(invalid)?;
                NodeEventContent::LoginReauthorizedAll
            }
            ContentTag::MasterAssigned => {
                NodeEventContent::MasterAssigned(serde_json::from_slice(payload).map_err(invalid)?)
            }
            ContentTag::TasksChanged => {
                let _: EmptyPayload = serde_json::from_slice(payload).map_err(invalid)?;
                NodeEventContent::TasksChanged
            }
            ContentTag::CollectionUpdated => NodeEventContent::CollectionUpdated(
                serde_json::from_slice(payload).map_err(invalid)?,
            ),
            ContentTag::ShutdownTriggered => {
                let _: EmptyPayload = serde_json::from_slice(payload).map_err(invalid)?;
                NodeEventContent::ShutdownTriggered
            }
        };
        Ok(decoded)
    }

    pub fn master_assigned(state: bool) -> Self {
        NodeEventContent::MasterAssigned(MasterAssignedPayload { state })
    }
}

/// A mailbox row addressed to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    /// Mailbox row id; ascending ids give the apply order.
    pub id: i64,
    pub target: NodeId,
    pub content: NodeEventContent,
}
