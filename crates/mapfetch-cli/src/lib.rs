//! Command-line front end for the mapfetch download orchestrator.
//!
//! The binary wires a catalog, a JSON state file and the simulated engine
//! into an [`OrchestratorService`](mapfetch_download::OrchestratorService)
//! and drives it from subcommands.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Only used by the binary target
use anyhow as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
