//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the core expects from infrastructure. They
//! use only domain types and contain no implementation details.

pub mod node_state;
pub mod transfer_engine;

pub use node_state::{NodeStateRepository, NoopRepository, PersistedNode, RepositoryError};
pub use transfer_engine::{BootstrapChunk, EngineEvent, ProgressSink, TransferEngine};

#[cfg(test)]
pub use node_state::MockNodeStateRepository;
