//! In-memory instance settings.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::{InstanceSettings, SettingsStore};

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: RwLock<InstanceSettings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: InstanceSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Replace the stored settings, as an admin edit would.
    pub async fn set(&self, settings: InstanceSettings) {
        *self.settings.write().await = settings;
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<InstanceSettings, DomainError> {
        Ok(self.settings.read().await.clone())
    }
}
