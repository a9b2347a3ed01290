//! Queue item types.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use mapfetch_core::NodeId;

/// FIFO key of a queued task.
///
/// The sequence number orders tasks; the instant is kept for diagnostics
/// (how long a task has been waiting).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnqueuedAt {
    pub seq: u64,
    pub at: Instant,
}

impl PartialOrd for EnqueuedAt {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnqueuedAt {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.seq.cmp(&other.seq)
    }
}

/// A queued intent to transfer one leaf.
///
/// Owned by the queue; observers only ever see [`QueueEntry`] copies.
#[derive(Clone, Debug)]
pub struct DownloadTask {
    pub node_id: NodeId,
    pub enqueued_at: EnqueuedAt,
    /// Number of earlier failed attempts for this node.
    pub attempt: u32,
}

impl DownloadTask {
    /// How long the task has been waiting.
    pub fn waited(&self) -> std::time::Duration {
        self.enqueued_at.at.elapsed()
    }
}

/// Serializable view of a queued task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: NodeId,
    /// 1-based position among waiting tasks.
    pub position: usize,
    pub attempt: u32,
}

/// Result of [`DownloadQueue::enqueue`](super::DownloadQueue::enqueue).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Appended at the given 1-based position.
    Added { position: usize },
    /// Already waiting; nothing changed.
    AlreadyQueued { position: usize },
}

impl EnqueueResult {
    pub const fn position(&self) -> usize {
        match self {
            Self::Added { position } | Self::AlreadyQueued { position } => *position,
        }
    }
}
