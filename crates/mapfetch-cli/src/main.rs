//! CLI entry point.
//!
//! Parses arguments, wires the context through [`bootstrap`] and dispatches
//! to a handler. Errors are reported with the exit code of their category.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use mapfetch_cli::{Cli, CliConfig, CliContext, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::from_cli(&cli)
        .with_fresh_bootstrap(matches!(command, Commands::Bootstrap { .. }));

    if let Err(err) = run(config, command).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise warnings, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "mapfetch=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: CliConfig, command: &Commands) -> Result<(), CliError> {
    let ctx: CliContext = bootstrap(config)?;

    match command {
        Commands::Status { id, json } => handlers::status::execute(&ctx, id.as_deref(), *json).await,
        Commands::Bootstrap { retries } => handlers::bootstrap::execute(&ctx, *retries).await,
        Commands::Download { ids, resume } => handlers::download::execute(&ctx, ids, *resume).await,
        Commands::Locate {
            lat,
            lon,
            accept,
            decline,
        } => handlers::locate::execute(&ctx, *lat, *lon, *accept, *decline).await,
        Commands::Delete { id } => handlers::delete::execute(&ctx, id).await,
        Commands::MarkOutdated { id } => handlers::outdated::mark(&ctx, id).await,
        Commands::Outdated => handlers::outdated::list(&ctx).await,
        Commands::Update { id } => handlers::outdated::update(&ctx, id).await,
    }
}
