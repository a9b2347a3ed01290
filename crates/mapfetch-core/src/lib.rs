//! Core domain of the map download orchestrator.
//!
//! Everything here is synchronous and runtime-free: the resource catalog,
//! node statuses and the state store, error codes, events, the
//! subscription registry, configuration, and the ports implemented by
//! infrastructure (transfer engine, state repository).
#![deny(unused_crate_dependencies)]

pub mod catalog;
pub mod config;
pub mod download;
pub mod ports;
pub mod store;
pub mod subscription;

pub use catalog::{
    BootstrapResource, Bounds, BoundsLocator, Catalog, CatalogError, CatalogNode, CatalogSpec,
    DEFAULT_ROOT_ID, Locator, NodeId, NodeSpec,
};
pub use config::{ConfigError, OrchestratorConfig};
pub use download::{
    BootstrapPhase, ErrorClass, ErrorCode, ErrorRecord, NodeStatus, StorageError, StorageEvent,
    StorageResult,
};
pub use ports::{
    BootstrapChunk, EngineEvent, NodeStateRepository, NoopRepository, PersistedNode,
    ProgressSink, RepositoryError, TransferEngine,
};
pub use store::{NodeState, NodeStateStore};
pub use subscription::{Callback, SubscriptionHandle, SubscriptionRegistry};
