//! Process-local schema and access caches.
//!
//! These keep a generation counter per reload and a history of what was
//! renewed. The schema builder and permission system that would fill them
//! are external; the cluster core only needs to trigger the reloads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, LoginId, ModuleId};
use crate::ports::{AccessCache, SchemaCache};

/// One schema reload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReload {
    pub module_ids: Vec<ModuleId>,
    pub new_version: bool,
}

#[derive(Debug, Default)]
pub struct InMemorySchemaCache {
    version: AtomicU64,
    reloads: RwLock<Vec<SchemaReload>>,
    fail: AtomicBool,
}

impl InMemorySchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current schema version, bumped on every `new_version` reload.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub async fn reloads(&self) -> Vec<SchemaReload> {
        self.reloads.read().await.clone()
    }

    /// Makes subsequent reloads fail, for error-path tests.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SchemaCache for InMemorySchemaCache {
    async fn reload(&self, module_ids: &[ModuleId], new_version: bool) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::CacheError, "Schema reload failed"));
        }

        if new_version {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        self.reloads.write().await.push(SchemaReload {
            module_ids: module_ids.to_vec(),
            new_version,
        });
        tracing::debug!(modules = module_ids.len(), new_version, "Schema cache reloaded");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccessCache {
    renewals: RwLock<Vec<Option<LoginId>>>,
    fail: AtomicBool,
}

impl InMemoryAccessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every renewal so far; `None` means all logins.
    pub async fn renewals(&self) -> Vec<Option<LoginId>> {
        self.renewals.read().await.clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccessCache for InMemoryAccessCache {
    async fn renew(&self, login_id: Option<LoginId>) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::CacheError, "Access renewal failed"));
        }

        self.renewals.write().await.push(login_id);
        match login_id {
            Some(id) => tracing::debug!(login_id = %id, "Access cache renewed"),
            None => tracing::debug!("Access cache renewed for all logins"),
        }
        Ok(())
    }
}
