//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Catalog (file or bundled demo catalog)
//! - State repository (JSON file)
//! - Transfer engine (simulated)
//! - Orchestrator service
//!
//! Command handlers receive the composed [`CliContext`] and talk to the
//! orchestrator through its handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mapfetch_core::{Catalog, OrchestratorConfig};
use mapfetch_download::{
    JsonFileRepository, Orchestrator, OrchestratorDeps, OrchestratorHandle, OrchestratorService,
    SimulatedEngine, SimulationSettings,
};

use crate::error::CliError;
use crate::parser::Cli;

/// Catalog used when no `--catalog` is given.
const DEMO_CATALOG: &str = include_str!("../assets/catalog.json");

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Catalog file; the bundled demo catalog when `None`.
    pub catalog_path: Option<PathBuf>,
    /// Node state file.
    pub state_path: PathBuf,
    /// Orchestrator config file; defaults when `None`.
    pub config_path: Option<PathBuf>,
    /// Pace of the simulated engine.
    pub simulation: SimulationSettings,
    /// Start with the bootstrap resources missing so they are transferred.
    pub fresh_bootstrap: bool,
}

impl CliConfig {
    /// Build the config from parsed arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            catalog_path: cli.catalog.clone(),
            state_path: cli.state.clone(),
            config_path: cli.config.clone(),
            simulation: SimulationSettings {
                chunk_size: cli.chunk_size.max(1),
                chunk_delay: Duration::from_millis(cli.chunk_delay_ms),
                ..SimulationSettings::default()
            },
            fresh_bootstrap: false,
        }
    }

    #[must_use]
    pub const fn with_fresh_bootstrap(mut self, fresh: bool) -> Self {
        self.fresh_bootstrap = fresh;
        self
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub catalog: Arc<Catalog>,
    pub engine: Arc<SimulatedEngine>,
    pub orchestrator: OrchestratorHandle,
    pub config: OrchestratorConfig,
}

impl std::fmt::Debug for CliContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliContext")
            .field("leaves", &self.catalog.leaf_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wire the catalog, repository and engine into a running orchestrator.
///
/// Must be called from inside a tokio runtime.
pub fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let catalog = Arc::new(match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::from_json_str(DEMO_CATALOG)?,
    });

    let orchestrator_config = match &config.config_path {
        Some(path) => OrchestratorConfig::from_json_file(path)?,
        None => OrchestratorConfig::default(),
    };
    orchestrator_config.validate()?;

    let repository = Arc::new(JsonFileRepository::open(&config.state_path)?);

    let mut engine = SimulatedEngine::new(Arc::clone(&catalog)).with_settings(config.simulation);
    if !config.fresh_bootstrap {
        engine = engine.with_bootstrap_present();
    }
    let engine = Arc::new(engine);

    let orchestrator = Orchestrator::new(
        OrchestratorDeps {
            catalog: Arc::clone(&catalog),
            engine: Arc::clone(&engine) as _,
            repository,
        },
        orchestrator_config.clone(),
    );

    tracing::debug!(
        state = %config.state_path.display(),
        leaves = catalog.leaf_count(),
        "CLI context ready"
    );

    Ok(CliContext {
        catalog,
        engine,
        orchestrator: OrchestratorService::spawn(orchestrator),
        config: orchestrator_config,
    })
}
