//! Orchestrator: the state machine tying catalog, store, queue and engine
//! together.
//!
//! # Architecture
//!
//! - **Orchestrator**: owns the bootstrap phase, the download queue and the
//!   single active transfer; the only writer of the node state store
//! - **Engine**: moves bytes on its own workers and reports back through a
//!   [`ProgressSink`] that feeds an internal channel
//! - **Host**: drives the orchestrator either synchronously (`pump()` after
//!   engine activity) or through the async service, which owns it on a
//!   single task
//!
//! # Invariants
//!
//! - At most one leaf is `Downloading` (single-flight)
//! - Engine reports about a node that is no longer active are ignored
//! - No automatic retries; every retry is an explicit call
//!
//! # Structure
//!
//! - `bootstrap` - Mandatory resource sequencing (`start`, `retry`, `cancel`)
//! - `offer` - Location-based download offer

mod bootstrap;
mod offer;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use mapfetch_core::{
    Catalog, EngineEvent, ErrorClass, ErrorCode, NodeId, NodeStateRepository, NodeStateStore,
    NodeStatus, OrchestratorConfig, ProgressSink, StorageError, StorageEvent, StorageResult,
    SubscriptionHandle, SubscriptionRegistry, TransferEngine,
};

use crate::progress::ProgressThrottle;
use crate::queue::{DownloadQueue, DownloadTask, QueueEntry};

pub use bootstrap::BootstrapStatus;
pub use offer::OfferDecision;

use offer::LocationOffer;

pub(crate) const LOG_TARGET: &str = "mapfetch.orchestrator";

/// Collaborators the orchestrator is built from.
pub struct OrchestratorDeps {
    /// Read-only catalog of regions and bootstrap resources.
    pub catalog: Arc<Catalog>,
    /// Byte-transport engine.
    pub engine: Arc<dyn TransferEngine>,
    /// Persistence of node statuses and the queue.
    pub repository: Arc<dyn NodeStateRepository>,
}

/// Result of a download request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// The leaf was queued at this 1-based position.
    Queued { position: usize },
    /// The leaf was already waiting; nothing changed.
    AlreadyQueued { position: usize },
    /// The leaf is the active transfer; the request was ignored.
    AlreadyDownloading,
    /// The leaf is on disk (use an update for out-of-date leaves).
    AlreadyOnDisk,
    /// A group request queued this many leaves.
    Group { queued: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Transferring,
    Indexing,
}

#[derive(Debug)]
struct ActiveTransfer {
    task: DownloadTask,
    stage: Stage,
}

/// Single authoritative download controller.
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    store: Arc<NodeStateStore>,
    events: Arc<SubscriptionRegistry<StorageEvent>>,
    engine: Arc<dyn TransferEngine>,
    repository: Arc<dyn NodeStateRepository>,
    config: OrchestratorConfig,

    queue: DownloadQueue,
    active: Option<ActiveTransfer>,
    /// Failed attempts per node since its last success or cancel.
    attempts: HashMap<NodeId, u32>,
    /// Set while transfers are halted by a storage disconnect.
    suspended: Option<ErrorCode>,
    throttle: ProgressThrottle,

    bootstrap: BootstrapStatus,
    /// A pause cancelled the file in flight; its failure report is still due.
    bootstrap_abandoned: bool,
    offer: LocationOffer,

    sink: ProgressSink,
    engine_rx: Option<mpsc::UnboundedReceiver<EngineEvent>>,
}

impl Orchestrator {
    /// Build an orchestrator and restore persisted node statuses.
    ///
    /// The download queue is not restored here; call
    /// [`restore_queue`](Self::restore_queue) once observers are attached.
    pub fn new(deps: OrchestratorDeps, config: OrchestratorConfig) -> Self {
        let events = Arc::new(SubscriptionRegistry::new());
        let store = Arc::new(
            NodeStateStore::new(
                Arc::clone(&deps.catalog),
                Arc::clone(&events),
                Arc::clone(&deps.repository),
            )
            .with_hierarchy_events(config.hierarchy_events),
        );
        let on_disk = store.restore();

        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(move |event| {
            // The receiver only goes away when the orchestrator is dropped.
            let _ = tx.send(event);
        });

        tracing::info!(
            target: LOG_TARGET,
            leaves = deps.catalog.leaf_count(),
            on_disk,
            "Orchestrator ready"
        );

        Self {
            catalog: deps.catalog,
            store,
            events,
            engine: deps.engine,
            repository: deps.repository,
            throttle: ProgressThrottle::new(config.progress_interval()),
            config,
            queue: DownloadQueue::new(),
            active: None,
            attempts: HashMap::new(),
            suspended: None,
            bootstrap: BootstrapStatus::default(),
            bootstrap_abandoned: false,
            offer: LocationOffer::default(),
            sink,
            engine_rx: Some(rx),
        }
    }

    // --- Accessors ---

    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Shared-read state store.
    pub const fn store(&self) -> &Arc<NodeStateStore> {
        &self.store
    }

    /// Registry every event is published to.
    pub const fn events(&self) -> &Arc<SubscriptionRegistry<StorageEvent>> {
        &self.events
    }

    pub fn engine(&self) -> Arc<dyn TransferEngine> {
        Arc::clone(&self.engine)
    }

    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Register an observer.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Remove an observer; stale handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    pub fn status_of(&self, id: &NodeId) -> NodeStatus {
        self.store.status_of(id)
    }

    /// Number of waiting tasks (the active transfer is not counted).
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_contains(&self, id: &NodeId) -> bool {
        self.queue.contains(id)
    }

    /// Waiting ids in order.
    pub fn queued_ids(&self) -> Vec<NodeId> {
        self.queue.ids()
    }

    pub fn queue_snapshot(&self) -> Vec<QueueEntry> {
        self.queue.snapshot()
    }

    /// Leaf currently transferring or indexing.
    pub fn active_node(&self) -> Option<&NodeId> {
        self.active.as_ref().map(|a| &a.task.node_id)
    }

    /// Reason transfers are halted, if they are.
    pub const fn suspended(&self) -> Option<ErrorCode> {
        self.suspended
    }

    // --- Engine reports ---

    /// Hand the engine report channel to an external event loop.
    ///
    /// After this, [`pump`](Self::pump) does nothing; the new owner must feed
    /// every report to [`handle_engine_event`](Self::handle_engine_event).
    pub const fn take_engine_events(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        self.engine_rx.take()
    }

    /// Apply every engine report received so far. Returns how many were
    /// applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.engine_rx.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.handle_engine_event(event);
            applied += 1;
        }
        applied
    }

    /// Apply one engine report.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Progress { id, current, total } => self.on_progress(&id, current, total),
            EngineEvent::TransferFinished { id, result } => self.on_transfer_finished(&id, result),
            EngineEvent::IndexBuilt { id, result } => self.on_index_built(&id, result),
        }
    }

    fn active_stage(&self, id: &NodeId) -> Option<Stage> {
        self.active
            .as_ref()
            .filter(|a| &a.task.node_id == id)
            .map(|a| a.stage)
    }

    fn on_progress(&mut self, id: &NodeId, current: u64, total: u64) {
        if self.active_stage(id) != Some(Stage::Transferring) {
            tracing::trace!(target: LOG_TARGET, id = %id, "Ignoring stale progress");
            return;
        }
        if self.throttle.should_emit(current, total) {
            if let Err(e) = self.store.set_progress(id, current, total) {
                tracing::warn!(target: LOG_TARGET, id = %id, error = %e, "Failed to record progress");
            }
        }
    }

    fn on_transfer_finished(&mut self, id: &NodeId, result: ErrorCode) {
        if self.active_stage(id) != Some(Stage::Transferring) {
            tracing::debug!(target: LOG_TARGET, id = %id, %result, "Ignoring stale transfer report");
            return;
        }

        match result.classify() {
            ErrorClass::Success => {
                if let Some(active) = self.active.as_mut() {
                    active.stage = Stage::Indexing;
                }
                self.transition(id, NodeStatus::GeneratingIndex, None);
                self.engine.build_index(id, self.sink.clone());
            }
            ErrorClass::Guard => {
                tracing::debug!(target: LOG_TARGET, id = %id, "Engine reports transfer already running");
            }
            ErrorClass::SuspendUntilReconnected => self.suspend(id, result),
            ErrorClass::Recoverable => self.fail_active(id, NodeStatus::NotDownloaded, result),
            ErrorClass::UserRecoverable => self.fail_active(id, NodeStatus::DownloadFailed, result),
            ErrorClass::Fatal => {
                tracing::error!(target: LOG_TARGET, id = %id, %result, "Fatal storage error");
                self.fail_active(id, NodeStatus::DownloadFailed, result);
            }
        }
    }

    fn on_index_built(&mut self, id: &NodeId, result: ErrorCode) {
        if self.active_stage(id) != Some(Stage::Indexing) {
            tracing::debug!(target: LOG_TARGET, id = %id, "Ignoring stale index report");
            return;
        }

        if result.is_failure() {
            tracing::warn!(target: LOG_TARGET, id = %id, %result, "Index build failed");
            self.fail_active(id, NodeStatus::DownloadFailed, result);
            return;
        }

        self.active = None;
        self.attempts.remove(id);
        if self.transition(id, NodeStatus::OnDisk, None) {
            tracing::info!(target: LOG_TARGET, id = %id, "Download complete");
        }
        self.queue_changed();
        self.start_next();
    }

    fn fail_active(&mut self, id: &NodeId, status: NodeStatus, code: ErrorCode) {
        let status = self.rest_status(id, status);
        self.active = None;
        *self.attempts.entry(id.clone()).or_default() += 1;
        tracing::warn!(target: LOG_TARGET, id = %id, code = %code, status = %status, "Download failed");
        self.transition(id, status, Some(code));
        self.queue_changed();
        self.start_next();
    }

    fn suspend(&mut self, id: &NodeId, code: ErrorCode) {
        let Some(active) = self.active.take() else {
            return;
        };
        tracing::warn!(target: LOG_TARGET, id = %id, %code, "Storage lost, suspending transfers");
        self.queue.push_front(active.task);
        self.suspended = Some(code);
        self.transition(id, NodeStatus::InQueue, Some(code));
        self.events
            .publish(&StorageEvent::TransfersSuspended { reason: code });
        self.queue_changed();
    }

    // --- Node downloads ---

    /// Request a download.
    ///
    /// A leaf is queued unless it is already queued, downloading or on disk.
    /// A group queues every leaf below it that is not on disk. The queue is
    /// drained immediately when nothing is transferring.
    pub fn enqueue_download(&mut self, id: &NodeId) -> StorageResult<EnqueueOutcome> {
        self.enqueue_nodes(id, false)
    }

    /// Confirm an update of out-of-date data.
    ///
    /// Leaves `OnDiskOutOfDate` are queued for re-download; other leaves
    /// behave as in [`enqueue_download`](Self::enqueue_download). A group
    /// queues only its out-of-date leaves.
    pub fn update_node(&mut self, id: &NodeId) -> StorageResult<EnqueueOutcome> {
        self.enqueue_nodes(id, true)
    }

    fn enqueue_nodes(&mut self, id: &NodeId, update: bool) -> StorageResult<EnqueueOutcome> {
        let node = self
            .catalog
            .get(id)
            .ok_or_else(|| StorageError::unknown_node(id.clone()))?;

        let outcome = if node.is_leaf() {
            self.enqueue_leaf(id, update)?
        } else {
            let catalog = Arc::clone(&self.catalog);
            let mut queued = 0;
            for leaf in catalog.leaves_under(id) {
                if update && self.store.status_of(leaf) != NodeStatus::OnDiskOutOfDate {
                    continue;
                }
                if matches!(self.enqueue_leaf(leaf, update)?, EnqueueOutcome::Queued { .. }) {
                    queued += 1;
                }
            }
            EnqueueOutcome::Group { queued }
        };

        if matches!(
            outcome,
            EnqueueOutcome::Queued { .. } | EnqueueOutcome::Group { queued: 1.. }
        ) {
            tracing::info!(target: LOG_TARGET, id = %id, ?outcome, "Queued download");
            self.queue_changed();
            self.start_next();
        }
        Ok(outcome)
    }

    fn enqueue_leaf(&mut self, id: &NodeId, update: bool) -> StorageResult<EnqueueOutcome> {
        match self.store.status_of(id) {
            NodeStatus::Downloading | NodeStatus::GeneratingIndex => {
                tracing::debug!(
                    target: LOG_TARGET,
                    id = %id,
                    code = %ErrorCode::FileInProgress,
                    "Ignoring start of running transfer"
                );
                Ok(EnqueueOutcome::AlreadyDownloading)
            }
            NodeStatus::InQueue => Ok(EnqueueOutcome::AlreadyQueued {
                position: self.queue.position(id).unwrap_or_default(),
            }),
            NodeStatus::OnDisk => Ok(EnqueueOutcome::AlreadyOnDisk),
            NodeStatus::OnDiskOutOfDate if !update => Ok(EnqueueOutcome::AlreadyOnDisk),
            _ => {
                let attempt = self.attempts.get(id).copied().unwrap_or_default();
                let position = self.queue.enqueue_attempt(id.clone(), attempt).position();
                if let Err(e) = self.store.set_status(id, NodeStatus::InQueue) {
                    self.queue.remove(id);
                    return Err(e);
                }
                Ok(EnqueueOutcome::Queued { position })
            }
        }
    }

    /// Start the head of the queue if nothing is transferring.
    ///
    /// Does nothing while transfers are suspended. Returns the started leaf.
    pub fn start_next(&mut self) -> Option<NodeId> {
        if self.active.is_some() || self.suspended.is_some() {
            return None;
        }

        let mut dropped = false;
        while let Some(task) = self.queue.dequeue() {
            let id = task.node_id.clone();
            match self.store.set_status(&id, NodeStatus::Downloading) {
                Ok(()) => {
                    tracing::info!(
                        target: LOG_TARGET,
                        id = %id,
                        attempt = task.attempt,
                        waited = ?task.waited(),
                        "Starting download"
                    );
                    self.throttle.reset();
                    self.active = Some(ActiveTransfer {
                        task,
                        stage: Stage::Transferring,
                    });
                    self.queue_changed();
                    self.engine.begin_node_transfer(&id, self.sink.clone());
                    return Some(id);
                }
                Err(e) => {
                    tracing::warn!(target: LOG_TARGET, id = %id, error = %e, "Dropping queued task");
                    dropped = true;
                }
            }
        }

        if dropped {
            self.queue_changed();
        }
        None
    }

    /// Halt the active transfer and put it back at the head of the queue.
    ///
    /// `id` may be the leaf or any group containing it. It resumes on the
    /// next [`start_next`](Self::start_next), ahead of anything queued after
    /// it. Returns whether a transfer was paused.
    pub fn pause_download(&mut self, id: &NodeId) -> StorageResult<bool> {
        if !self.catalog.contains(id) {
            return Err(StorageError::unknown_node(id.clone()));
        }
        let Some(active_id) = self
            .active
            .as_ref()
            .filter(|a| a.stage == Stage::Transferring)
            .map(|a| a.task.node_id.clone())
        else {
            return Ok(false);
        };
        if !self.covers(id, &active_id) {
            return Ok(false);
        }
        let Some(active) = self.active.take() else {
            return Ok(false);
        };

        self.engine.pause_node_transfer(&active_id);
        self.queue.push_front(active.task);
        self.transition(&active_id, NodeStatus::InQueue, None);
        tracing::info!(target: LOG_TARGET, id = %active_id, "Paused download");
        self.queue_changed();
        Ok(true)
    }

    /// Cancel downloads of a leaf or of every leaf under a group.
    ///
    /// Silent: whatever the prior status, queued or active leaves end up
    /// `NotDownloaded` and out of the queue, failed leaves are reset, and
    /// anything else is left alone. A cancelled update goes back to
    /// `OnDiskOutOfDate` with its old data. The active transfer's partial
    /// data is discarded by the engine.
    pub fn cancel_download(&mut self, id: &NodeId) -> StorageResult<()> {
        if !self.catalog.contains(id) {
            return Err(StorageError::unknown_node(id.clone()));
        }

        let catalog = Arc::clone(&self.catalog);
        let mut queue_touched = false;
        let mut freed = false;
        for leaf in catalog.leaves_under(id) {
            if self.active_stage(leaf).is_some() {
                self.active = None;
                self.engine.cancel_node_transfer(leaf);
                freed = true;
                self.transition(leaf, self.rest_status(leaf, NodeStatus::NotDownloaded), None);
            } else if self.queue.remove(leaf) {
                queue_touched = true;
                self.transition(leaf, self.rest_status(leaf, NodeStatus::NotDownloaded), None);
            } else if self.store.status_of(leaf) == NodeStatus::DownloadFailed {
                self.transition(leaf, NodeStatus::NotDownloaded, None);
            }
            self.attempts.remove(leaf);
        }

        if queue_touched || freed {
            tracing::info!(target: LOG_TARGET, id = %id, "Cancelled download");
            self.queue_changed();
        }
        if freed {
            self.start_next();
        }
        Ok(())
    }

    /// Re-queue the leaves under `id` (or `id` itself) whose last attempt
    /// ended `DownloadFailed`. Returns how many were queued; leaves in any
    /// other status are left alone.
    pub fn retry_download(&mut self, id: &NodeId) -> StorageResult<usize> {
        if !self.catalog.contains(id) {
            return Err(StorageError::unknown_node(id.clone()));
        }

        let catalog = Arc::clone(&self.catalog);
        let mut queued = 0;
        for leaf in catalog.leaves_under(id) {
            if self.store.status_of(leaf) != NodeStatus::DownloadFailed {
                continue;
            }
            if matches!(self.enqueue_leaf(leaf, false)?, EnqueueOutcome::Queued { .. }) {
                queued += 1;
            }
        }

        if queued > 0 {
            tracing::info!(target: LOG_TARGET, id = %id, queued, "Retrying failed downloads");
            self.queue_changed();
            self.start_next();
        }
        Ok(queued)
    }

    /// Remove local data of a leaf, or of every on-disk leaf under a group.
    pub fn delete_local(&mut self, id: &NodeId) -> StorageResult<()> {
        if !self.catalog.contains(id) {
            return Err(StorageError::unknown_node(id.clone()));
        }
        let on_disk: Vec<NodeId> = self
            .catalog
            .leaves_under(id)
            .iter()
            .filter(|leaf| self.store.status_of(leaf).is_on_disk())
            .cloned()
            .collect();
        if on_disk.is_empty() {
            return Err(StorageError::NotOnDisk { id: id.clone() });
        }

        for leaf in on_disk {
            self.engine
                .delete_local(&leaf)
                .map_err(StorageError::engine)?;
            self.store.set_status(&leaf, NodeStatus::NotDownloaded)?;
            tracing::info!(target: LOG_TARGET, id = %leaf, "Deleted local data");
        }
        Ok(())
    }

    /// Flag on-disk leaves (under `id`) as out of date after a new data
    /// version is published. Returns how many leaves changed.
    pub fn mark_out_of_date(&mut self, id: &NodeId) -> StorageResult<usize> {
        if !self.catalog.contains(id) {
            return Err(StorageError::unknown_node(id.clone()));
        }
        let mut marked = 0;
        for leaf in self.catalog.leaves_under(id) {
            if self.store.status_of(leaf) == NodeStatus::OnDisk {
                self.store.set_status(leaf, NodeStatus::OnDiskOutOfDate)?;
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// Leaves with a newer published version, in catalog order.
    pub fn outdated_nodes(&self) -> Vec<NodeId> {
        self.store.leaves_with_status(NodeStatus::OnDiskOutOfDate)
    }

    /// Resume after a storage disconnect. Returns the leaf that restarted.
    pub fn storage_reconnected(&mut self) -> Option<NodeId> {
        if self.suspended.take().is_none() {
            return None;
        }
        tracing::info!(target: LOG_TARGET, "Storage reconnected, resuming transfers");
        self.events.publish(&StorageEvent::TransfersResumed);
        self.start_next()
    }

    /// Re-queue the persisted download queue. Returns how many leaves were
    /// queued.
    pub fn restore_queue(&mut self) -> usize {
        if !self.config.persist_queue {
            return 0;
        }
        let ids = match self.repository.load_queue() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "Failed to load download queue");
                return 0;
            }
        };

        let mut restored = 0;
        for id in ids {
            if !self.catalog.is_leaf(&id) {
                tracing::debug!(target: LOG_TARGET, id = %id, "Skipping unknown queued node");
                continue;
            }
            match self.enqueue_leaf(&id, true) {
                Ok(EnqueueOutcome::Queued { .. }) => restored += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: LOG_TARGET, id = %id, error = %e, "Cannot restore queued node");
                }
            }
        }

        if restored > 0 {
            tracing::info!(target: LOG_TARGET, restored, "Restored download queue");
            self.queue_changed();
            self.start_next();
        }
        restored
    }

    /// Combined `(downloaded, total)` bytes over the given nodes.
    ///
    /// Counts leaves that are queued, in flight or on disk; on-disk and
    /// indexing leaves count as complete.
    pub fn overall_progress(&self, ids: &[NodeId]) -> (u64, u64) {
        let mut seen = HashSet::new();
        let (mut current, mut total) = (0u64, 0u64);
        for id in ids {
            for leaf in self.catalog.leaves_under(id) {
                if !seen.insert(leaf) {
                    continue;
                }
                let size = self.catalog.remote_size(leaf);
                let done = match self.store.status_of(leaf) {
                    NodeStatus::OnDisk | NodeStatus::GeneratingIndex => size,
                    NodeStatus::Downloading => self.store.progress_of(leaf).map_or(0, |(c, _)| c),
                    NodeStatus::InQueue => 0,
                    _ => continue,
                };
                current = current.saturating_add(done);
                total = total.saturating_add(size);
            }
        }
        (current, total)
    }

    // --- Helpers ---

    /// Whether `group` is `leaf` itself, an ancestor of it, or the root.
    fn covers(&self, group: &NodeId, leaf: &NodeId) -> bool {
        group == leaf || self.catalog.is_root(group) || self.catalog.ancestors(leaf).contains(group)
    }

    /// Where a leaf rests once its pending transfer is dropped: back on its
    /// old copy when it was an update, otherwise `fallback`.
    fn rest_status(&self, id: &NodeId, fallback: NodeStatus) -> NodeStatus {
        if self.store.local_size(id) > 0 {
            NodeStatus::OnDiskOutOfDate
        } else {
            fallback
        }
    }

    /// Apply an internal status change, logging if the store rejects it.
    fn transition(&self, id: &NodeId, status: NodeStatus, error: Option<ErrorCode>) -> bool {
        match self.store.set_status_with_error(id, status, error) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(target: LOG_TARGET, id = %id, error = %e, "Rejected status change");
                false
            }
        }
    }

    /// Persist the queue (active transfer first) and announce its length.
    fn queue_changed(&self) {
        if self.config.persist_queue {
            let mut ids = Vec::with_capacity(self.queue.len() + 1);
            if let Some(active) = &self.active {
                ids.push(active.task.node_id.clone());
            }
            ids.extend(self.queue.ids());
            if let Err(e) = self.repository.save_queue(&ids) {
                tracing::warn!(target: LOG_TARGET, error = %e, "Failed to persist download queue");
            }
        }
        self.events.publish(&StorageEvent::QueueChanged {
            len: self.queue.len(),
        });
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("bootstrap", &self.bootstrap)
            .field("queue_len", &self.queue.len())
            .field("active", &self.active_node())
            .field("suspended", &self.suspended)
            .finish_non_exhaustive()
    }
}
