//! Node state repository port definition.
//!
//! Persists what must survive a restart: per-node status and local size,
//! and the ids waiting in the download queue. Progress is high churn and
//! stays in memory.
//!
//! The repository is a key-value blob keyed by node id, written on every
//! status change. Calls are synchronous and expected to be quick; the
//! store calls them while serializing a status change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::NodeId;
use crate::download::NodeStatus;

/// Persisted record of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNode {
    pub status: NodeStatus,
    #[serde(default)]
    pub local_size: u64,
}

/// Domain-specific errors for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Storage backend error (filesystem, key-value store, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting node state.
#[cfg_attr(test, mockall::automock)]
pub trait NodeStateRepository: Send + Sync {
    /// Record the status of one node.
    fn save_status(&self, id: &NodeId, node: &PersistedNode) -> Result<(), RepositoryError>;

    /// Load every persisted node record.
    fn load_statuses(&self) -> Result<HashMap<NodeId, PersistedNode>, RepositoryError>;

    /// Replace the persisted download queue.
    fn save_queue(&self, ids: &[NodeId]) -> Result<(), RepositoryError>;

    /// Load the persisted download queue in order.
    fn load_queue(&self) -> Result<Vec<NodeId>, RepositoryError>;
}

/// Repository that persists nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRepository;

impl NodeStateRepository for NoopRepository {
    fn save_status(&self, _id: &NodeId, _node: &PersistedNode) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn load_statuses(&self) -> Result<HashMap<NodeId, PersistedNode>, RepositoryError> {
        Ok(HashMap::new())
    }

    fn save_queue(&self, _ids: &[NodeId]) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn load_queue(&self) -> Result<Vec<NodeId>, RepositoryError> {
        Ok(Vec::new())
    }
}
