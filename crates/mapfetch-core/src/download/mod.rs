//! Download domain types, events and errors.
//!
//! Pure data types; no I/O or runtime dependencies.
//!
//! # Structure
//!
//! - `status` - Node status and bootstrap phase state machines
//! - `errors` - Engine result codes and the API error type
//! - `events` - Events delivered through the subscription registry

pub mod errors;
pub mod events;
pub mod status;

pub use errors::{ErrorClass, ErrorCode, ErrorRecord, StorageError, StorageResult};
pub use events::StorageEvent;
pub use status::{BootstrapPhase, NodeStatus};
