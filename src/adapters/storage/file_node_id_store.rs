//! File-based Node Id Storage Adapter
//!
//! Stores the node identity as a small YAML document so a restarted process
//! re-registers as the same node instead of appearing as a new one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::domain::foundation::{DomainError, ErrorCode, NodeId};
use crate::ports::NodeIdStore;

/// Errors reading or writing the node file.
#[derive(Debug, Error)]
pub enum NodeFileError {
    #[error("node file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("node file {path} is not valid YAML: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl From<NodeFileError> for DomainError {
    fn from(err: NodeFileError) -> Self {
        let code = match &err {
            NodeFileError::Io { .. } => ErrorCode::IoError,
            NodeFileError::Format { .. } => ErrorCode::InvalidFormat,
        };
        DomainError::new(code, err.to_string())
    }
}

/// On-disk layout of the node file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NodeFile {
    node_id: NodeId,
}

/// File-based storage for the node id
#[derive(Debug, Clone)]
pub struct FileNodeIdStore {
    path: PathBuf,
}

impl FileNodeIdStore {
    /// Create a store backed by the YAML file at `path`.
    ///
    /// Missing parent directories are created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> NodeFileError {
        NodeFileError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl NodeIdStore for FileNodeIdStore {
    async fn load(&self) -> Result<Option<NodeId>, DomainError> {
        let yaml = match fs::read_to_string(&self.path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e).into()),
        };

        let file: NodeFile = serde_yaml::from_str(&yaml).map_err(|source| NodeFileError::Format {
            path: self.path.clone(),
            source,
        })?;

        Ok(Some(file.node_id))
    }

    async fn save(&self, id: &NodeId) -> Result<(), DomainError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(|e| self.io_error(e))?;
        }

        let yaml = serde_yaml::to_string(&NodeFile { node_id: *id }).map_err(|source| {
            NodeFileError::Format {
                path: self.path.clone(),
                source,
            }
        })?;

        fs::write(&self.path, yaml).await.map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileNodeIdStore::new(dir.path().join("node.yaml"));

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_id_survives_a_new_store_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("node.yaml");
        let id = NodeId::new();

        FileNodeIdStore::new(&path).save(&id).await.unwrap();
        let loaded = FileNodeIdStore::new(&path).load().await.unwrap();

        assert_eq!(loaded, Some(id));
    }

    #[tokio::test]
    async fn file_is_human_readable_yaml() {
        let dir = TempDir::new().unwrap();
        let store = FileNodeIdStore::new(dir.path().join("node.yaml"));
        let id = NodeId::new();
        store.save(&id).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("node_id"));
        assert!(content.contains(&id.to_string()));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.yaml");
        std::fs::write(&path, "node_id: [not, a, uuid").unwrap();

        let err = FileNodeIdStore::new(&path).load().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }
}
