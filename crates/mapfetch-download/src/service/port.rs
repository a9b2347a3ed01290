//! Async port over the orchestrator service.
//!
//! Hosts (CLI, UI bridges) depend on this trait rather than on the
//! concrete handle, so they can be driven by a fake in tests.

use async_trait::async_trait;

use mapfetch_core::{
    BootstrapPhase, CatalogNode, NodeId, NodeStatus, StorageEvent, StorageResult,
    SubscriptionHandle,
};

use crate::orchestrator::EnqueueOutcome;

/// Operations of the download orchestrator, callable from any task.
///
/// Every mutating call is serialized through the orchestrator task; reads
/// go straight to the shared store.
#[async_trait]
pub trait OrchestratorPort: Send + Sync {
    // --- Bootstrap ---

    /// Probe and begin the bootstrap download. Returns the phase reached
    /// once the size is known.
    async fn start(&self) -> StorageResult<BootstrapPhase>;

    /// Restart a failed bootstrap.
    async fn retry(&self) -> StorageResult<BootstrapPhase>;

    /// Give up after a bootstrap failure.
    async fn cancel(&self) -> StorageResult<BootstrapPhase>;

    async fn pause_bootstrap(&self) -> StorageResult<()>;

    async fn resume_bootstrap(&self) -> StorageResult<()>;

    // --- Location offer ---

    async fn set_location(&self, lat: f64, lon: f64) -> StorageResult<Option<NodeId>>;

    async fn offer_location_based_download(&self) -> StorageResult<Option<CatalogNode>>;

    async fn accept_offer(&self) -> StorageResult<EnqueueOutcome>;

    async fn decline_offer(&self) -> StorageResult<()>;

    // --- Node downloads ---

    async fn enqueue_download(&self, id: &NodeId) -> StorageResult<EnqueueOutcome>;

    async fn pause_download(&self, id: &NodeId) -> StorageResult<bool>;

    async fn cancel_download(&self, id: &NodeId) -> StorageResult<()>;

    /// Re-queue the failed leaves under `id`. Returns how many were queued.
    async fn retry_download(&self, id: &NodeId) -> StorageResult<usize>;

    async fn delete_local(&self, id: &NodeId) -> StorageResult<()>;

    async fn update_node(&self, id: &NodeId) -> StorageResult<EnqueueOutcome>;

    async fn mark_out_of_date(&self, id: &NodeId) -> StorageResult<usize>;

    async fn outdated_nodes(&self) -> StorageResult<Vec<NodeId>>;

    async fn storage_reconnected(&self) -> StorageResult<Option<NodeId>>;

    async fn restore_queue(&self) -> StorageResult<usize>;

    async fn overall_progress(&self, ids: &[NodeId]) -> StorageResult<(u64, u64)>;

    // --- Reads and observers ---

    fn status_of(&self, id: &NodeId) -> NodeStatus;

    fn subscribe(
        &self,
        callback: Box<dyn Fn(&StorageEvent) + Send + Sync>,
    ) -> SubscriptionHandle;

    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool;
}
