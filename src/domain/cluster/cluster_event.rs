//! In-process cluster events routed by the client hub.
//!
//! These never touch the database. They are produced by node event handlers
//! or local request handling and consumed exactly once by the hub loop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::LoginId;

/// Kind of client application holding a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    #[default]
    Browser,
    FatClient,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Browser => "browser",
            DeviceClass::FatClient => "fatClient",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "browser" => Ok(DeviceClass::Browser),
            "fatClient" => Ok(DeviceClass::FatClient),
            other => Err(format!("unknown device class: {}", other)),
        }
    }
}

/// What a cluster event asks the hub to do with matching clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterEventContent {
    /// Disconnect matching clients.
    Kick,
    /// Disconnect matching clients without admin rights.
    KickNonAdmin,
    /// Client should reload its schema and access state.
    Renew,
    /// Login permissions changed; client should refresh its access.
    Reauthorized,
    ConfigChanged,
    SchemaLoading,
    SchemaLoaded,
    CollectionChanged,
}

impl ClusterEventContent {
    /// Kick events remove clients instead of delivering a payload.
    pub fn is_kick(&self) -> bool {
        matches!(self, ClusterEventContent::Kick | ClusterEventContent::KickNonAdmin)
    }

    /// Name used as `result` in unsolicited pushes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterEventContent::Kick => "kick",
            ClusterEventContent::KickNonAdmin => "kickNonAdmin",
            ClusterEventContent::Renew => "renew",
            ClusterEventContent::Reauthorized => "reauthorized",
            ClusterEventContent::ConfigChanged => "configChanged",
            ClusterEventContent::SchemaLoading => "schemaLoading",
            ClusterEventContent::SchemaLoaded => "schemaLoaded",
            ClusterEventContent::CollectionChanged => "collectionChanged",
        }
    }
}

impl fmt::Display for ClusterEventContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which clients an event applies to. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTarget {
    pub address: Option<String>,
    pub device: Option<DeviceClass>,
    /// `LoginId::NONE` targets every login.
    pub login_id: LoginId,
}

impl EventTarget {
    /// Targets every connected client.
    pub fn all() -> Self {
        Self::default()
    }

    /// Targets every client of one login.
    pub fn login(login_id: LoginId) -> Self {
        Self {
            login_id,
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: DeviceClass) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Checks a client's identity against every filter of this target.
    pub fn matches(&self, login_id: LoginId, device: DeviceClass, address: &str) -> bool {
        if !self.login_id.is_none() && self.login_id != login_id {
            return false;
        }
        if matches!(self.device, Some(d) if d != device) {
            return false;
        }
        if matches!(&self.address, Some(a) if a != address) {
            return false;
        }
        true
    }
}

/// An event for the hub: content, optional payload, and target filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEvent {
    pub content: ClusterEventContent,
    pub payload: serde_json::Value,
    pub target: EventTarget,
}

impl ClusterEvent {
    pub fn new(content: ClusterEventContent, target: EventTarget) -> Self {
        Self {
            content,
            payload: serde_json::Value::Null,
            target,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn kick_login(login_id: LoginId) -> Self {
        Self::new(ClusterEventContent::Kick, EventTarget::login(login_id))
    }

    pub fn kick_non_admins() -> Self {
        Self::new(ClusterEventContent::KickNonAdmin, EventTarget::all())
    }

    pub fn renew_all() -> Self {
        Self::new(ClusterEventContent::Renew, EventTarget::all())
    }
}
