//! Node state store: the authoritative status of every catalog leaf.
//!
//! Readers on any thread get consistent snapshots through a `RwLock`;
//! only the orchestrator writes. Every status change is persisted through
//! the [`NodeStateRepository`] port and then published through the
//! subscription registry. Publishing is the last step and happens after the
//! write lock is released, so an observer that re-reads on receipt always
//! sees the new value.
//!
//! Inner nodes hold no state of their own. Their status, sizes and progress
//! are derived from the leaves below them on every read.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, NodeId};
use crate::download::{ErrorCode, NodeStatus, StorageError, StorageEvent, StorageResult};
use crate::ports::{NodeStateRepository, PersistedNode};
use crate::subscription::SubscriptionRegistry;

/// Mutable state of one leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LeafEntry {
    status: NodeStatus,
    local_size: u64,
    error: Option<ErrorCode>,
    progress: Option<(u64, u64)>,
}

/// Materialized view of one node, for hosts and tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: NodeId,
    pub status: NodeStatus,
    pub local_size: u64,
    pub remote_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<(u64, u64)>,
}

/// Shared-read, orchestrator-written status table.
pub struct NodeStateStore {
    catalog: Arc<Catalog>,
    leaves: RwLock<HashMap<NodeId, LeafEntry>>,
    events: Arc<SubscriptionRegistry<StorageEvent>>,
    repository: Arc<dyn NodeStateRepository>,
    hierarchy_events: bool,
}

impl NodeStateStore {
    /// Create a store with every leaf `Unknown`. Call [`restore`](Self::restore)
    /// before use.
    pub fn new(
        catalog: Arc<Catalog>,
        events: Arc<SubscriptionRegistry<StorageEvent>>,
        repository: Arc<dyn NodeStateRepository>,
    ) -> Self {
        let leaves = catalog
            .leaves()
            .map(|node| (node.id.clone(), LeafEntry::default()))
            .collect();
        Self {
            catalog,
            leaves: RwLock::new(leaves),
            events,
            repository,
            hierarchy_events: true,
        }
    }

    /// Enable or disable ancestor notifications after each leaf event.
    #[must_use]
    pub const fn with_hierarchy_events(mut self, enabled: bool) -> Self {
        self.hierarchy_events = enabled;
        self
    }

    /// The catalog this store tracks.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Registry the store publishes to.
    #[must_use]
    pub const fn events(&self) -> &Arc<SubscriptionRegistry<StorageEvent>> {
        &self.events
    }

    /// Load persisted state.
    ///
    /// On-disk statuses survive a restart; anything transient comes back as
    /// `NotDownloaded`, or `OnDiskOutOfDate` when it was an update of data
    /// still on disk (the queue is restored separately). A repository
    /// failure is logged and leaves everything `NotDownloaded`. Returns the
    /// number of leaves found on disk.
    pub fn restore(&self) -> usize {
        let persisted = match self.repository.load_statuses() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load node statuses, starting empty");
                HashMap::new()
            }
        };

        let mut on_disk = 0;
        let mut leaves = self.leaves.write().unwrap_or_else(PoisonError::into_inner);
        for (id, entry) in leaves.iter_mut() {
            *entry = match persisted.get(id) {
                Some(saved) if saved.status.is_on_disk() => {
                    on_disk += 1;
                    LeafEntry {
                        status: saved.status,
                        local_size: saved.local_size,
                        ..LeafEntry::default()
                    }
                }
                // An update interrupted by shutdown still has the old copy.
                Some(saved) if saved.status.is_pending() && saved.local_size > 0 => {
                    on_disk += 1;
                    LeafEntry {
                        status: NodeStatus::OnDiskOutOfDate,
                        local_size: saved.local_size,
                        ..LeafEntry::default()
                    }
                }
                _ => LeafEntry {
                    status: NodeStatus::NotDownloaded,
                    ..LeafEntry::default()
                },
            };
        }
        drop(leaves);

        tracing::debug!(on_disk, persisted = persisted.len(), "Restored node statuses");
        on_disk
    }

    /// Status of a node. Inner nodes report an aggregate of their leaves;
    /// unknown ids report `Unknown`.
    #[must_use]
    pub fn status_of(&self, id: &NodeId) -> NodeStatus {
        let leaves = self.leaves.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = leaves.get(id) {
            return entry.status;
        }
        if !self.catalog.contains(id) {
            return NodeStatus::Unknown;
        }
        aggregate_status(
            self.catalog
                .leaves_under(id)
                .iter()
                .filter_map(|leaf| leaves.get(leaf).map(|e| e.status)),
        )
    }

    /// Change a leaf's status.
    pub fn set_status(&self, id: &NodeId, status: NodeStatus) -> StorageResult<()> {
        self.set_status_with_error(id, status, None)
    }

    /// Change a leaf's status, recording the failure that caused it.
    ///
    /// Setting the current status again is a no-op and publishes nothing.
    pub fn set_status_with_error(
        &self,
        id: &NodeId,
        status: NodeStatus,
        error: Option<ErrorCode>,
    ) -> StorageResult<()> {
        let remote = self.catalog.remote_size(id);
        let persisted = {
            let mut leaves = self.leaves.write().unwrap_or_else(PoisonError::into_inner);
            let entry = leaves.get_mut(id).ok_or_else(|| self.not_a_leaf(id))?;
            if entry.status == status {
                return Ok(());
            }
            if !entry.status.can_transition_to(status) {
                return Err(StorageError::InvalidTransition {
                    id: id.clone(),
                    from: entry.status,
                    to: status,
                });
            }

            entry.status = status;
            entry.error = error;
            // Old data stays in place until an update replaces it.
            entry.local_size = match status {
                NodeStatus::OnDisk => remote,
                NodeStatus::OnDiskOutOfDate
                | NodeStatus::InQueue
                | NodeStatus::Downloading
                | NodeStatus::GeneratingIndex => entry.local_size,
                _ => 0,
            };
            if !status.is_pending() {
                entry.progress = None;
            }
            PersistedNode {
                status,
                local_size: entry.local_size,
            }
        };

        if let Err(e) = self.repository.save_status(id, &persisted) {
            tracing::warn!(id = %id, error = %e, "Failed to persist node status");
        }

        self.events.publish(&StorageEvent::StatusChanged {
            id: id.clone(),
            status,
            error,
        });
        if self.hierarchy_events {
            for ancestor in self.catalog.ancestors(id) {
                let status = self.status_of(ancestor);
                self.events
                    .publish(&StorageEvent::status(ancestor.clone(), status));
            }
        }
        Ok(())
    }

    /// Record transfer progress of a leaf and publish it.
    pub fn set_progress(&self, id: &NodeId, current: u64, total: u64) -> StorageResult<()> {
        {
            let mut leaves = self.leaves.write().unwrap_or_else(PoisonError::into_inner);
            let entry = leaves.get_mut(id).ok_or_else(|| self.not_a_leaf(id))?;
            entry.progress = Some((current, total));
        }

        self.events.publish(&StorageEvent::Progress {
            id: id.clone(),
            current,
            total,
        });
        if self.hierarchy_events {
            for ancestor in self.catalog.ancestors(id) {
                if let Some((current, total)) = self.progress_of(ancestor) {
                    self.events.publish(&StorageEvent::Progress {
                        id: ancestor.clone(),
                        current,
                        total,
                    });
                }
            }
        }
        Ok(())
    }

    /// Bytes present locally. For inner nodes the sum over leaves.
    #[must_use]
    pub fn local_size(&self, id: &NodeId) -> u64 {
        let leaves = self.leaves.read().unwrap_or_else(PoisonError::into_inner);
        self.catalog
            .leaves_under(id)
            .iter()
            .filter_map(|leaf| leaves.get(leaf))
            .map(|e| e.local_size)
            .sum()
    }

    /// Remote size from the catalog.
    #[must_use]
    pub fn remote_size(&self, id: &NodeId) -> u64 {
        self.catalog.remote_size(id)
    }

    /// Failure recorded with the leaf's last status change.
    #[must_use]
    pub fn error_of(&self, id: &NodeId) -> Option<ErrorCode> {
        self.leaves
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .and_then(|e| e.error)
    }

    /// Current transfer progress as `(current, total)`.
    ///
    /// For inner nodes: bytes over all pending leaves below, with leaves
    /// already indexing counted as complete. `None` when nothing below is
    /// pending.
    #[must_use]
    pub fn progress_of(&self, id: &NodeId) -> Option<(u64, u64)> {
        let leaves = self.leaves.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = leaves.get(id) {
            return entry.progress;
        }

        let mut any = false;
        let (mut current, mut total) = (0u64, 0u64);
        for leaf in self.catalog.leaves_under(id) {
            let Some(entry) = leaves.get(leaf) else {
                continue;
            };
            if !entry.status.is_pending() {
                continue;
            }
            any = true;
            let size = self.catalog.remote_size(leaf);
            total = total.saturating_add(size);
            current = current.saturating_add(match entry.status {
                NodeStatus::GeneratingIndex => size,
                _ => entry.progress.map_or(0, |(c, _)| c),
            });
        }
        any.then_some((current, total))
    }

    /// Leaves currently in the given status, in catalog order.
    #[must_use]
    pub fn leaves_with_status(&self, status: NodeStatus) -> Vec<NodeId> {
        let leaves = self.leaves.read().unwrap_or_else(PoisonError::into_inner);
        self.catalog
            .leaves()
            .filter(|node| leaves.get(&node.id).is_some_and(|e| e.status == status))
            .map(|node| node.id.clone())
            .collect()
    }

    /// Full view of one node.
    #[must_use]
    pub fn state_of(&self, id: &NodeId) -> Option<NodeState> {
        if !self.catalog.contains(id) {
            return None;
        }
        Some(NodeState {
            id: id.clone(),
            status: self.status_of(id),
            local_size: self.local_size(id),
            remote_size: self.remote_size(id),
            error: self.error_of(id),
            progress: self.progress_of(id),
        })
    }

    /// View of every leaf in catalog order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NodeState> {
        let leaves = self.leaves.read().unwrap_or_else(PoisonError::into_inner);
        self.catalog
            .leaves()
            .filter_map(|node| {
                leaves.get(&node.id).map(|entry| NodeState {
                    id: node.id.clone(),
                    status: entry.status,
                    local_size: entry.local_size,
                    remote_size: node.remote_size_bytes,
                    error: entry.error,
                    progress: entry.progress,
                })
            })
            .collect()
    }

    fn not_a_leaf(&self, id: &NodeId) -> StorageError {
        if self.catalog.contains(id) {
            StorageError::not_a_leaf(id.clone())
        } else {
            StorageError::unknown_node(id.clone())
        }
    }
}

impl std::fmt::Debug for NodeStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStateStore")
            .field("leaves", &self.catalog.leaf_count())
            .field("hierarchy_events", &self.hierarchy_events)
            .finish_non_exhaustive()
    }
}

/// Derive a group status from its leaves.
///
/// Activity wins over rest states: anything downloading makes the group
/// downloading, then indexing, queued, failed, out of date. Otherwise the
/// group is on disk when every leaf is, partly on disk when some are.
fn aggregate_status(statuses: impl Iterator<Item = NodeStatus>) -> NodeStatus {
    let mut seen = Vec::new();
    for status in statuses {
        if !seen.contains(&status) {
            seen.push(status);
        }
    }
    if seen.is_empty() {
        return NodeStatus::Unknown;
    }

    for priority in [
        NodeStatus::Downloading,
        NodeStatus::GeneratingIndex,
        NodeStatus::InQueue,
        NodeStatus::DownloadFailed,
        NodeStatus::OnDiskOutOfDate,
    ] {
        if seen.contains(&priority) {
            return priority;
        }
    }

    match (
        seen.contains(&NodeStatus::OnDisk),
        seen.iter().all(|s| *s == NodeStatus::OnDisk),
    ) {
        (true, true) => NodeStatus::OnDisk,
        (true, false) => NodeStatus::Partly,
        _ => NodeStatus::NotDownloaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSpec, NodeSpec};
    use crate::ports::{MockNodeStateRepository, NoopRepository, RepositoryError};
    use std::sync::Mutex;

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_spec(CatalogSpec::new(vec![
                NodeSpec::group(
                    "Europe",
                    vec![NodeSpec::leaf("FR", 1000), NodeSpec::leaf("DE", 2000)],
                ),
                NodeSpec::leaf("JP", 500),
            ]))
            .unwrap(),
        )
    }

    fn store() -> (NodeStateStore, Arc<Mutex<Vec<StorageEvent>>>) {
        let events = Arc::new(SubscriptionRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        events.subscribe(move |e: &StorageEvent| sink.lock().unwrap().push(e.clone()));
        let store = NodeStateStore::new(catalog(), events, Arc::new(NoopRepository));
        store.restore();
        (store, log)
    }

    fn download(store: &NodeStateStore, id: &NodeId) {
        for status in [
            NodeStatus::InQueue,
            NodeStatus::Downloading,
            NodeStatus::GeneratingIndex,
            NodeStatus::OnDisk,
        ] {
            store.set_status(id, status).unwrap();
        }
    }

    #[test]
    fn test_restore_defaults_to_not_downloaded() {
        let (store, _) = store();
        assert_eq!(store.status_of(&NodeId::new("FR")), NodeStatus::NotDownloaded);
        assert_eq!(store.status_of(&NodeId::new("XX")), NodeStatus::Unknown);
    }

    #[test]
    fn test_set_status_publishes_leaf_then_ancestors() {
        let (store, log) = store();
        store.set_status(&NodeId::new("FR"), NodeStatus::InQueue).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                StorageEvent::status("FR", NodeStatus::InQueue),
                StorageEvent::status("Europe", NodeStatus::InQueue),
            ]
        );
    }

    #[test]
    fn test_same_status_is_silent_noop() {
        let (store, log) = store();
        store
            .set_status(&NodeId::new("JP"), NodeStatus::NotDownloaded)
            .unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let (store, log) = store();
        let err = store
            .set_status(&NodeId::new("FR"), NodeStatus::OnDisk)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_group_status_cannot_be_set() {
        let (store, _) = store();
        assert!(matches!(
            store.set_status(&NodeId::new("Europe"), NodeStatus::InQueue),
            Err(StorageError::NotALeaf { .. })
        ));
        assert!(matches!(
            store.set_status(&NodeId::new("XX"), NodeStatus::InQueue),
            Err(StorageError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_local_size_follows_status() {
        let (store, _) = store();
        let fr = NodeId::new("FR");
        download(&store, &fr);
        assert_eq!(store.local_size(&fr), 1000);
        assert_eq!(store.local_size(&NodeId::new("Europe")), 1000);

        store.set_status(&fr, NodeStatus::OnDiskOutOfDate).unwrap();
        assert_eq!(store.local_size(&fr), 1000);

        store.set_status(&fr, NodeStatus::NotDownloaded).unwrap();
        assert_eq!(store.local_size(&fr), 0);
    }

    #[test]
    fn test_update_keeps_old_data_until_replaced() {
        let (store, _) = store();
        let fr = NodeId::new("FR");
        download(&store, &fr);
        store.set_status(&fr, NodeStatus::OnDiskOutOfDate).unwrap();

        store.set_status(&fr, NodeStatus::InQueue).unwrap();
        store.set_status(&fr, NodeStatus::Downloading).unwrap();
        assert_eq!(store.local_size(&fr), 1000);

        store.set_status(&fr, NodeStatus::OnDiskOutOfDate).unwrap();
        assert_eq!(store.local_size(&fr), 1000);

        // A fresh download has nothing to keep.
        let jp = NodeId::new("JP");
        store.set_status(&jp, NodeStatus::InQueue).unwrap();
        assert_eq!(store.local_size(&jp), 0);
    }

    #[test]
    fn test_group_aggregation() {
        let (store, _) = store();
        let europe = NodeId::new("Europe");
        assert_eq!(store.status_of(&europe), NodeStatus::NotDownloaded);

        download(&store, &NodeId::new("FR"));
        assert_eq!(store.status_of(&europe), NodeStatus::Partly);

        store.set_status(&NodeId::new("DE"), NodeStatus::InQueue).unwrap();
        assert_eq!(store.status_of(&europe), NodeStatus::InQueue);

        store
            .set_status(&NodeId::new("DE"), NodeStatus::Downloading)
            .unwrap();
        assert_eq!(store.status_of(&europe), NodeStatus::Downloading);

        store
            .set_status(&NodeId::new("DE"), NodeStatus::GeneratingIndex)
            .unwrap();
        store.set_status(&NodeId::new("DE"), NodeStatus::OnDisk).unwrap();
        assert_eq!(store.status_of(&europe), NodeStatus::OnDisk);
    }

    #[test]
    fn test_error_recorded_and_cleared() {
        let (store, log) = store();
        let fr = NodeId::new("FR");
        store.set_status(&fr, NodeStatus::InQueue).unwrap();
        store.set_status(&fr, NodeStatus::Downloading).unwrap();
        store
            .set_status_with_error(&fr, NodeStatus::NotDownloaded, Some(ErrorCode::DownloadError))
            .unwrap();
        assert_eq!(store.error_of(&fr), Some(ErrorCode::DownloadError));
        assert!(log.lock().unwrap().contains(&StorageEvent::StatusChanged {
            id: fr.clone(),
            status: NodeStatus::NotDownloaded,
            error: Some(ErrorCode::DownloadError),
        }));

        store.set_status(&fr, NodeStatus::InQueue).unwrap();
        assert_eq!(store.error_of(&fr), None);
    }

    #[test]
    fn test_progress_hierarchy() {
        let (store, log) = store();
        let fr = NodeId::new("FR");
        let de = NodeId::new("DE");
        store.set_status(&fr, NodeStatus::InQueue).unwrap();
        store.set_status(&de, NodeStatus::InQueue).unwrap();
        store.set_status(&fr, NodeStatus::Downloading).unwrap();
        log.lock().unwrap().clear();

        store.set_progress(&fr, 400, 1000).unwrap();
        assert_eq!(store.progress_of(&fr), Some((400, 1000)));
        assert_eq!(store.progress_of(&NodeId::new("Europe")), Some((400, 3000)));
        assert_eq!(store.progress_of(&NodeId::new("JP")), None);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[1],
            StorageEvent::Progress {
                id: NodeId::new("Europe"),
                current: 400,
                total: 3000
            }
        );
    }

    #[test]
    fn test_hierarchy_events_can_be_disabled() {
        let events = Arc::new(SubscriptionRegistry::new());
        let count = Arc::new(Mutex::new(0usize));
        let c = Arc::clone(&count);
        events.subscribe(move |_: &StorageEvent| *c.lock().unwrap() += 1);
        let store = NodeStateStore::new(catalog(), events, Arc::new(NoopRepository))
            .with_hierarchy_events(false);
        store.restore();

        store.set_status(&NodeId::new("FR"), NodeStatus::InQueue).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_restore_keeps_only_on_disk_states() {
        let mut repo = MockNodeStateRepository::new();
        repo.expect_load_statuses().returning(|| {
            Ok(HashMap::from([
                (
                    NodeId::new("FR"),
                    PersistedNode {
                        status: NodeStatus::OnDisk,
                        local_size: 1000,
                    },
                ),
                (
                    NodeId::new("DE"),
                    PersistedNode {
                        status: NodeStatus::Downloading,
                        local_size: 0,
                    },
                ),
                (
                    NodeId::new("JP"),
                    PersistedNode {
                        status: NodeStatus::OnDiskOutOfDate,
                        local_size: 450,
                    },
                ),
            ]))
        });
        let store = NodeStateStore::new(
            catalog(),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(repo),
        );

        assert_eq!(store.restore(), 2);
        assert_eq!(store.status_of(&NodeId::new("FR")), NodeStatus::OnDisk);
        assert_eq!(store.status_of(&NodeId::new("DE")), NodeStatus::NotDownloaded);
        assert_eq!(store.status_of(&NodeId::new("JP")), NodeStatus::OnDiskOutOfDate);
        assert_eq!(store.local_size(&NodeId::new("JP")), 450);
    }

    #[test]
    fn test_restore_interrupted_update_as_out_of_date() {
        let mut repo = MockNodeStateRepository::new();
        repo.expect_load_statuses().returning(|| {
            Ok(HashMap::from([(
                NodeId::new("FR"),
                PersistedNode {
                    status: NodeStatus::Downloading,
                    local_size: 900,
                },
            )]))
        });
        let store = NodeStateStore::new(
            catalog(),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(repo),
        );

        assert_eq!(store.restore(), 1);
        assert_eq!(store.status_of(&NodeId::new("FR")), NodeStatus::OnDiskOutOfDate);
        assert_eq!(store.local_size(&NodeId::new("FR")), 900);
    }

    #[test]
    fn test_every_change_is_persisted() {
        let mut repo = MockNodeStateRepository::new();
        repo.expect_load_statuses().returning(|| Ok(HashMap::new()));
        repo.expect_save_status()
            .withf(|id, node| id.as_str() == "JP" && node.status == NodeStatus::InQueue)
            .times(1)
            .returning(|_, _| Ok(()));
        let store = NodeStateStore::new(
            catalog(),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(repo),
        );
        store.restore();

        store.set_status(&NodeId::new("JP"), NodeStatus::InQueue).unwrap();
    }

    #[test]
    fn test_persistence_failure_is_soft() {
        let mut repo = MockNodeStateRepository::new();
        repo.expect_load_statuses()
            .returning(|| Err(RepositoryError::Storage("offline".into())));
        repo.expect_save_status()
            .returning(|_, _| Err(RepositoryError::Storage("offline".into())));
        let store = NodeStateStore::new(
            catalog(),
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(repo),
        );
        assert_eq!(store.restore(), 0);

        store.set_status(&NodeId::new("JP"), NodeStatus::InQueue).unwrap();
        assert_eq!(store.status_of(&NodeId::new("JP")), NodeStatus::InQueue);
    }

    #[test]
    fn test_observer_rereads_new_status() {
        let (store, _) = store();
        let store = Arc::new(store);
        let seen = Arc::new(Mutex::new(None));
        let reader = Arc::clone(&store);
        let slot = Arc::clone(&seen);
        store.events().subscribe(move |e: &StorageEvent| {
            if let StorageEvent::StatusChanged { id, .. } = e {
                if id.as_str() == "JP" {
                    *slot.lock().unwrap() = Some(reader.status_of(id));
                }
            }
        });

        store.set_status(&NodeId::new("JP"), NodeStatus::InQueue).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(NodeStatus::InQueue));
    }

    #[test]
    fn test_snapshot_in_catalog_order() {
        let (store, _) = store();
        let ids: Vec<_> = store.snapshot().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![NodeId::new("FR"), NodeId::new("DE"), NodeId::new("JP")]);
        let europe = store.state_of(&NodeId::new("Europe")).unwrap();
        assert_eq!(europe.remote_size, 3000);
    }
}
