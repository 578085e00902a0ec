//! Storage Adapters
//!
//! Implementations of the NodeIdStore port for persisting the node identity.
//!
//! ## Available Adapters
//!
//! - **FileNodeIdStore** - Stores the node id in a YAML node file
//! - **InMemoryNodeIdStore** - Keeps the node id in memory (testing)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileNodeIdStore, InMemoryNodeIdStore};
//!
//! // Production: survives restarts
//! let store = FileNodeIdStore::new("./data/node.yaml");
//!
//! // Testing
//! let store = InMemoryNodeIdStore::new();
//! ```

mod file_node_id_store;
mod in_memory_node_id_store;

pub use file_node_id_store::{FileNodeIdStore, NodeFileError};
pub use in_memory_node_id_store::InMemoryNodeIdStore;
