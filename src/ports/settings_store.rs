//! SettingsStore port - instance settings shared by every node.
//!
//! Settings live in the shared database. A `configChanged` event tells each
//! node to re-read them and re-apply whatever it caches locally.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

use super::LoginLimits;

/// Instance settings a node applies locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSettings {
    /// Only admins may connect while set.
    pub maintenance_mode: bool,

    /// Brute-force protection for authentication attempts.
    pub login_limits: LoginLimits,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            maintenance_mode: false,
            login_limits: LoginLimits::default(),
        }
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the current settings from the database.
    async fn load(&self) -> Result<InstanceSettings, DomainError>;
}
