//! Error codes surfaced by the transfer engine and the orchestrator's API
//! error type.
//!
//! Both are serializable so they can cross process or FFI boundaries
//! unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::catalog::NodeId;
use super::status::{BootstrapPhase, NodeStatus};

/// Result code reported by the transfer engine.
///
/// Raw values match the engine's integer protocol: zero is success,
/// negative values are failures or sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Success,
    /// Local allocation or disk failure. Also reported as "not enough memory".
    DiskError,
    NotEnoughFreeSpace,
    StorageDisconnected,
    /// Generic network failure, including engine-side timeouts.
    DownloadError,
    /// Bootstrap sentinel: every file has been transferred.
    NoMoreFiles,
    /// The node is already being transferred.
    FileInProgress,
}

/// What the orchestrator does with a result code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Not an error.
    Success,
    /// Escalate to the host; no retry.
    Fatal,
    /// Surface a specific message; the user may retry after acting.
    UserRecoverable,
    /// Suspend every transfer until storage is reconnected.
    SuspendUntilReconnected,
    /// Revert to the previous stable state; the user may retry.
    Recoverable,
    /// Not a failure; the request is rejected without a state change.
    Guard,
}

impl ErrorCode {
    /// Convert from the engine's integer code.
    ///
    /// Unknown negative values are treated as a generic download error.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Success,
            -1 => Self::DiskError,
            -2 => Self::NotEnoughFreeSpace,
            -3 => Self::StorageDisconnected,
            -5 => Self::NoMoreFiles,
            -6 => Self::FileInProgress,
            _ => Self::DownloadError,
        }
    }

    /// Integer code as understood by the engine.
    #[must_use]
    pub const fn as_raw(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::DiskError => -1,
            Self::NotEnoughFreeSpace => -2,
            Self::StorageDisconnected => -3,
            Self::DownloadError => -4,
            Self::NoMoreFiles => -5,
            Self::FileInProgress => -6,
        }
    }

    /// Classify the code into the orchestrator's handling policy.
    #[must_use]
    pub const fn classify(&self) -> ErrorClass {
        match self {
            Self::Success | Self::NoMoreFiles => ErrorClass::Success,
            Self::DiskError => ErrorClass::Fatal,
            Self::NotEnoughFreeSpace => ErrorClass::UserRecoverable,
            Self::StorageDisconnected => ErrorClass::SuspendUntilReconnected,
            Self::DownloadError => ErrorClass::Recoverable,
            Self::FileInProgress => ErrorClass::Guard,
        }
    }

    /// Check whether the code represents a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(
            self.classify(),
            ErrorClass::Success | ErrorClass::Guard
        )
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::DiskError => "disk_error",
            Self::NotEnoughFreeSpace => "not_enough_free_space",
            Self::StorageDisconnected => "storage_disconnected",
            Self::DownloadError => "download_error",
            Self::NoMoreFiles => "no_more_files",
            Self::FileInProgress => "file_in_progress",
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Success | Self::NoMoreFiles => "Done.",
            Self::DiskError => "Not enough memory or the disk is unavailable.",
            Self::NotEnoughFreeSpace => "Not enough free space. Free some space and retry.",
            Self::StorageDisconnected => {
                "Storage was disconnected. Downloads resume once it is back."
            }
            Self::DownloadError => "Download failed. Check your connection and retry.",
            Self::FileInProgress => "This map is already downloading.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.as_raw())
    }
}

/// A failure reported by the engine, optionally tied to a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl ErrorRecord {
    /// A failure of the bootstrap sequence.
    #[must_use]
    pub const fn bootstrap(code: ErrorCode) -> Self {
        Self {
            code,
            node_id: None,
        }
    }

    /// A failure of a node transfer.
    #[must_use]
    pub const fn node(code: ErrorCode, node_id: NodeId) -> Self {
        Self {
            code,
            node_id: Some(node_id),
        }
    }
}

/// Error type for orchestrator and store operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StorageError {
    /// The id is not in the catalog.
    #[error("Unknown node: {id}")]
    UnknownNode { id: NodeId },

    /// The operation requires a leaf.
    #[error("Node {id} is a group, not a downloadable region")]
    NotALeaf { id: NodeId },

    /// The requested status change is not an edge of the status graph.
    #[error("Invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: NodeId,
        from: NodeStatus,
        to: NodeStatus,
    },

    /// The bootstrap operation is not allowed in the current phase.
    #[error("Bootstrap is {phase}, cannot {action}")]
    InvalidPhase {
        phase: BootstrapPhase,
        action: String,
    },

    /// The node has no local data to delete.
    #[error("Node {id} is not on disk")]
    NotOnDisk { id: NodeId },

    /// No location-based offer is pending.
    #[error("No download offer is available")]
    NoOffer,

    /// The engine rejected the request.
    #[error("Engine error: {code}")]
    Engine { code: ErrorCode },

    /// The orchestrator task is gone.
    #[error("Orchestrator is shut down")]
    Shutdown,
}

impl StorageError {
    pub fn unknown_node(id: impl Into<NodeId>) -> Self {
        Self::UnknownNode { id: id.into() }
    }

    pub fn not_a_leaf(id: impl Into<NodeId>) -> Self {
        Self::NotALeaf { id: id.into() }
    }

    pub fn invalid_phase(phase: BootstrapPhase, action: impl Into<String>) -> Self {
        Self::InvalidPhase {
            phase,
            action: action.into(),
        }
    }

    #[must_use]
    pub const fn engine(code: ErrorCode) -> Self {
        Self::Engine { code }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownNode { id } => format!("'{id}' is not a known region."),
            Self::NotALeaf { id } => format!("'{id}' is a group of regions."),
            Self::InvalidTransition { id, .. } => {
                format!("'{id}' cannot do that right now.")
            }
            Self::InvalidPhase { phase, action } => {
                format!("Cannot {action} while base maps are {phase}.")
            }
            Self::NotOnDisk { id } => format!("'{id}' is not downloaded."),
            Self::NoOffer => "There is no map to offer for your location.".to_string(),
            Self::Engine { code } => code.user_message().to_string(),
            Self::Shutdown => "The download service has stopped.".to_string(),
        }
    }
}

/// Convenience result type for orchestrator operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_codes() {
        assert_eq!(ErrorCode::NotEnoughFreeSpace.as_raw(), -2);
        assert_eq!(ErrorCode::from_raw(-3), ErrorCode::StorageDisconnected);
        assert_eq!(ErrorCode::from_raw(0), ErrorCode::Success);
        assert_eq!(ErrorCode::from_raw(-42), ErrorCode::DownloadError);
    }

    #[test]
    fn test_classification() {
        assert_eq!(ErrorCode::NoMoreFiles.classify(), ErrorClass::Success);
        assert_eq!(ErrorCode::DiskError.classify(), ErrorClass::Fatal);
        assert_eq!(
            ErrorCode::NotEnoughFreeSpace.classify(),
            ErrorClass::UserRecoverable
        );
        assert_eq!(
            ErrorCode::StorageDisconnected.classify(),
            ErrorClass::SuspendUntilReconnected
        );
        assert_eq!(ErrorCode::DownloadError.classify(), ErrorClass::Recoverable);
        assert_eq!(ErrorCode::FileInProgress.classify(), ErrorClass::Guard);
    }

    #[test]
    fn test_is_failure() {
        assert!(ErrorCode::DownloadError.is_failure());
        assert!(!ErrorCode::NoMoreFiles.is_failure());
        assert!(!ErrorCode::FileInProgress.is_failure());
    }

    #[test]
    fn test_error_serialization() {
        let err = StorageError::InvalidTransition {
            id: NodeId::new("FR"),
            from: NodeStatus::NotDownloaded,
            to: NodeStatus::OnDisk,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("not_downloaded"));

        let parsed: StorageError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_user_messages() {
        let err = StorageError::engine(ErrorCode::NotEnoughFreeSpace);
        assert!(err.user_message().contains("free space"));
        assert!(StorageError::unknown_node("XX").user_message().contains("XX"));
    }
}
