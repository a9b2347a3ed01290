//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<(), CliError>`
//! - Thin wrappers that parse CLI input, call the orchestrator handle and
//!   format output for the terminal
//!
//! Handlers never touch the engine or the repository directly.

pub mod bootstrap;
pub mod delete;
pub mod download;
pub mod follow;
pub mod locate;
pub mod outdated;
pub mod status;
