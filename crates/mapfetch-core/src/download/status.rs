//! Node status and bootstrap phase state machines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Download status of a catalog node.
///
/// Leaves move through the download states. Inner nodes never hold a
/// status of their own; the store derives one from their leaves, which is
/// the only place [`NodeStatus::Partly`] appears.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// No information yet (before the store is restored).
    #[default]
    Unknown,
    /// Not present locally.
    NotDownloaded,
    /// Waiting in the download queue.
    InQueue,
    /// The single active transfer.
    Downloading,
    /// Transfer finished, the search index is being built.
    GeneratingIndex,
    /// Present locally and current.
    OnDisk,
    /// Present locally but a newer version is published.
    OnDiskOutOfDate,
    /// Last attempt failed for a reason the user must resolve.
    DownloadFailed,
    /// Group only: some but not all leaves are on disk.
    Partly,
}

impl NodeStatus {
    /// Stable string form, used for persistence and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotDownloaded => "not_downloaded",
            Self::InQueue => "in_queue",
            Self::Downloading => "downloading",
            Self::GeneratingIndex => "generating_index",
            Self::OnDisk => "on_disk",
            Self::OnDiskOutOfDate => "on_disk_out_of_date",
            Self::DownloadFailed => "download_failed",
            Self::Partly => "partly",
        }
    }

    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "not_downloaded" => Self::NotDownloaded,
            "in_queue" => Self::InQueue,
            "downloading" => Self::Downloading,
            "generating_index" => Self::GeneratingIndex,
            "on_disk" => Self::OnDisk,
            "on_disk_out_of_date" => Self::OnDiskOutOfDate,
            "download_failed" => Self::DownloadFailed,
            "partly" => Self::Partly,
            _ => Self::Unknown,
        }
    }

    /// Check whether local data exists for this status.
    #[must_use]
    pub const fn is_on_disk(&self) -> bool {
        matches!(self, Self::OnDisk | Self::OnDiskOutOfDate)
    }

    /// Check whether the node is queued or being processed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::InQueue | Self::Downloading | Self::GeneratingIndex)
    }

    /// Allowed edges of the leaf status graph.
    ///
    /// Same-status "transitions" are not edges; callers treat them as no-ops.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        use NodeStatus::{
            DownloadFailed, Downloading, GeneratingIndex, InQueue, NotDownloaded, OnDisk,
            OnDiskOutOfDate, Partly, Unknown,
        };
        match (*self, next) {
            (_, Partly | Unknown) | (Partly, _) => false,
            // Restore sets the initial state.
            (Unknown, NotDownloaded | OnDisk | OnDiskOutOfDate) => true,
            (NotDownloaded | DownloadFailed | OnDiskOutOfDate, InQueue) => true,
            (InQueue, Downloading) => true,
            (Downloading, GeneratingIndex | InQueue | DownloadFailed) => true,
            (GeneratingIndex, OnDisk | DownloadFailed) => true,
            // A cancelled or failed update falls back to the old data.
            (OnDisk | InQueue | Downloading | GeneratingIndex, OnDiskOutOfDate) => true,
            (
                InQueue | Downloading | GeneratingIndex | DownloadFailed | OnDisk | OnDiskOutOfDate,
                NotDownloaded,
            ) => true,
            _ => false,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global phase of the mandatory bootstrap download.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    #[default]
    NotStarted,
    ComputingSize,
    Transferring,
    Complete,
    Failed,
    /// The user gave up after a failure; the host ends the flow.
    Cancelled,
}

impl BootstrapPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::ComputingSize => "computing_size",
            Self::Transferring => "transferring",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check whether the phase is final for this run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }

    /// Allowed edges of the bootstrap graph.
    ///
    /// `Failed -> ComputingSize` is the retry edge; nothing leads back out of
    /// `Complete` or `Cancelled`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (*self, next),
            (Self::NotStarted | Self::Failed, Self::ComputingSize)
                | (
                    Self::ComputingSize,
                    Self::Transferring | Self::Complete | Self::Failed
                )
                | (Self::Transferring, Self::Complete | Self::Failed)
                | (Self::Failed, Self::Cancelled)
        )
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
