//! Transfer engine port definition.
//!
//! The engine is the external collaborator that moves bytes: HTTP fetch,
//! disk write, checksum, and the post-download index build. The
//! orchestrator only sequences it.
//!
//! # Threading
//!
//! Node transfers are fire-and-forget: `begin_node_transfer` returns
//! immediately and the engine reports back through the [`ProgressSink`]
//! from its own worker. The sink forwards to the orchestrator's
//! serialization point; engines never touch orchestrator state directly.
//!
//! Bootstrap transfers are pull-based: `transfer_next_bootstrap_file`
//! blocks for the duration of one file and may be run on a blocking pool.

use std::fmt;
use std::sync::Arc;

use crate::catalog::NodeId;
use crate::download::ErrorCode;

/// Report sent by the engine about a node transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// Bytes transferred so far for the node.
    Progress {
        id: NodeId,
        current: u64,
        total: u64,
    },
    /// The byte transfer ended.
    TransferFinished { id: NodeId, result: ErrorCode },
    /// The index build ended.
    IndexBuilt { id: NodeId, result: ErrorCode },
}

impl EngineEvent {
    /// Node this report is about.
    #[must_use]
    pub const fn id(&self) -> &NodeId {
        match self {
            Self::Progress { id, .. }
            | Self::TransferFinished { id, .. }
            | Self::IndexBuilt { id, .. } => id,
        }
    }
}

/// Channel back to the orchestrator for engine reports.
///
/// Cheap to clone; the engine may keep copies on its workers.
#[derive(Clone)]
pub struct ProgressSink {
    deliver: Arc<dyn Fn(EngineEvent) + Send + Sync>,
}

impl ProgressSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(EngineEvent) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// A sink that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Send a report.
    pub fn send(&self, event: EngineEvent) {
        (self.deliver)(event);
    }

    pub fn progress(&self, id: &NodeId, current: u64, total: u64) {
        self.send(EngineEvent::Progress {
            id: id.clone(),
            current,
            total,
        });
    }

    pub fn finished(&self, id: &NodeId, result: ErrorCode) {
        self.send(EngineEvent::TransferFinished {
            id: id.clone(),
            result,
        });
    }

    pub fn index_built(&self, id: &NodeId, result: ErrorCode) {
        self.send(EngineEvent::IndexBuilt {
            id: id.clone(),
            result,
        });
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

/// Outcome of one bootstrap file transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootstrapChunk {
    /// Bytes moved by this call.
    pub bytes: u64,
    /// `Success` when more files remain, `NoMoreFiles` when done, or a
    /// failure code.
    pub result: ErrorCode,
}

impl BootstrapChunk {
    #[must_use]
    pub const fn transferred(bytes: u64) -> Self {
        Self {
            bytes,
            result: ErrorCode::Success,
        }
    }

    #[must_use]
    pub const fn done() -> Self {
        Self {
            bytes: 0,
            result: ErrorCode::NoMoreFiles,
        }
    }

    #[must_use]
    pub const fn failed(code: ErrorCode) -> Self {
        Self {
            bytes: 0,
            result: code,
        }
    }
}

/// Port for the byte-transport engine.
pub trait TransferEngine: Send + Sync {
    /// Sum of remote sizes of bootstrap files not yet present.
    fn probe_bootstrap_size(&self) -> Result<u64, ErrorCode>;

    /// Transfer the next missing bootstrap file. May block.
    fn transfer_next_bootstrap_file(&self) -> BootstrapChunk;

    /// Ask the engine to halt the bootstrap file in flight.
    ///
    /// The blocked `transfer_next_bootstrap_file` call returns at its next
    /// checkpoint; the partial file is kept for resumption.
    fn cancel_bootstrap_file(&self);

    /// Start transferring a leaf. Returns immediately.
    fn begin_node_transfer(&self, id: &NodeId, sink: ProgressSink);

    /// Halt a transfer, keeping the partial artifact for resumption.
    fn pause_node_transfer(&self, id: &NodeId);

    /// Halt a transfer and delete the partial artifact.
    fn cancel_node_transfer(&self, id: &NodeId);

    /// Build the search index for a freshly downloaded leaf. Returns
    /// immediately; the result arrives as [`EngineEvent::IndexBuilt`].
    fn build_index(&self, id: &NodeId, sink: ProgressSink);

    /// Remove the local files of a leaf.
    fn delete_local(&self, id: &NodeId) -> Result<(), ErrorCode>;

    /// Resolve coordinates to a catalog leaf.
    fn find_leaf_by_location(&self, lat: f64, lon: f64) -> Option<NodeId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sink_forwards_reports() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let sink = ProgressSink::new(move |event| log.lock().unwrap().push(event));

        let id = NodeId::new("FR");
        sink.progress(&id, 10, 100);
        sink.clone().finished(&id, ErrorCode::Success);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].id(), &id);
        assert_eq!(
            seen[1],
            EngineEvent::TransferFinished {
                id,
                result: ErrorCode::Success
            }
        );
    }

    #[test]
    fn test_chunk_constructors() {
        assert_eq!(BootstrapChunk::done().result, ErrorCode::NoMoreFiles);
        assert_eq!(BootstrapChunk::transferred(400).bytes, 400);
        assert_eq!(
            BootstrapChunk::failed(ErrorCode::DownloadError).result,
            ErrorCode::DownloadError
        );
    }
}
