//! Storage events - discriminated union for everything observers see.

use serde::{Deserialize, Serialize};

use super::errors::ErrorCode;
use super::status::{BootstrapPhase, NodeStatus};
use crate::catalog::NodeId;

/// Single discriminated union for all storage events.
///
/// Serialized with a `type` tag:
///
/// ```text
/// { "type": "status_changed", "id": "FR", "status": "downloading" }
/// { "type": "progress", "id": "FR", "current": 400, "total": 1000 }
/// { "type": "bootstrap_phase_changed", "phase": "failed", "error": "download_error" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageEvent {
    /// A node's status changed. Emitted for the leaf, then for each ancestor.
    StatusChanged {
        id: NodeId,
        status: NodeStatus,
        /// Failure that caused the change, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorCode>,
    },

    /// Byte progress of a node transfer.
    Progress { id: NodeId, current: u64, total: u64 },

    /// The bootstrap phase changed.
    BootstrapPhaseChanged {
        phase: BootstrapPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorCode>,
    },

    /// Cumulative bootstrap bytes.
    BootstrapProgress { downloaded: u64, total: u64 },

    /// The download queue length changed.
    QueueChanged { len: usize },

    /// All node transfers are halted until storage comes back.
    TransfersSuspended { reason: ErrorCode },

    /// Transfers were resumed.
    TransfersResumed,
}

impl StorageEvent {
    /// Create a status change without an error.
    pub fn status(id: impl Into<NodeId>, status: NodeStatus) -> Self {
        Self::StatusChanged {
            id: id.into(),
            status,
            error: None,
        }
    }

    /// Get the event kind as a string (useful for logging/filtering).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "status_changed",
            Self::Progress { .. } => "progress",
            Self::BootstrapPhaseChanged { .. } => "bootstrap_phase_changed",
            Self::BootstrapProgress { .. } => "bootstrap_progress",
            Self::QueueChanged { .. } => "queue_changed",
            Self::TransfersSuspended { .. } => "transfers_suspended",
            Self::TransfersResumed => "transfers_resumed",
        }
    }

    /// Node this event is about, if any.
    #[must_use]
    pub const fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::StatusChanged { id, .. } | Self::Progress { id, .. } => Some(id),
            _ => None,
        }
    }
}
