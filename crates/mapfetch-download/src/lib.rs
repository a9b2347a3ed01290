//! Download orchestration for mapfetch.
//!
//! Sequences the mandatory bootstrap download, then region downloads one at
//! a time through a FIFO queue, and publishes every state change through
//! the subscription registry from `mapfetch-core`.
//!
//! # Structure
//!
//! - `orchestrator` - The synchronous state machine ([`Orchestrator`])
//! - `service` - Async actor hosting the orchestrator ([`OrchestratorService`])
//! - `queue` - FIFO download queue
//! - `progress` - Progress throttling
//! - `repository` - In-memory and JSON file state repositories
//! - `simulated` - In-process engine that fakes transfers

// Re-export core types for convenience
pub use mapfetch_core::{
    BootstrapPhase, Catalog, ErrorCode, NodeId, NodeStatus, OrchestratorConfig, StorageError,
    StorageEvent, StorageResult, SubscriptionHandle,
};

pub(crate) mod progress;
pub mod queue;

mod orchestrator;
mod repository;
mod service;
mod simulated;

#[cfg(test)]
mod testing;

pub use orchestrator::{BootstrapStatus, EnqueueOutcome, OfferDecision, Orchestrator, OrchestratorDeps};
pub use progress::ProgressThrottle;
pub use queue::{DownloadQueue, QueueEntry};
pub use repository::{InMemoryRepository, JsonFileRepository};
pub use service::{OrchestratorHandle, OrchestratorPort, OrchestratorService, QueueView};
pub use simulated::{SimulatedEngine, SimulationSettings};
