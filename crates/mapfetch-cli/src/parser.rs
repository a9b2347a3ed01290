//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the map download orchestrator.
///
/// Global options choose the catalog, the state file and the pace of the
/// simulated engine; subcommands drive the orchestrator.
#[derive(Parser, Debug)]
#[command(name = "mapfetch")]
#[command(about = "Download map regions one at a time after the bootstrap resources")]
#[command(version)]
pub struct Cli {
    /// Catalog JSON describing the bootstrap resources and the region tree
    /// (the bundled demo catalog when omitted)
    #[arg(long, global = true, env = "MAPFETCH_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// File holding node statuses and the queue between runs
    #[arg(
        long,
        global = true,
        env = "MAPFETCH_STATE",
        default_value = "mapfetch-state.json"
    )]
    pub state: PathBuf,

    /// Orchestrator configuration JSON
    #[arg(long, global = true, env = "MAPFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bytes moved per step by the simulated engine
    #[arg(long, global = true, default_value_t = 4 * 1024 * 1024)]
    pub chunk_size: u64,

    /// Milliseconds between steps of the simulated engine
    #[arg(long, global = true, default_value_t = 20)]
    pub chunk_delay_ms: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "mapfetch",
            "--verbose",
            "--state",
            "/tmp/state.json",
            "status",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.state, PathBuf::from("/tmp/state.json"));
        assert!(matches!(cli.command, Some(Commands::Status { .. })));
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::parse_from([
            "mapfetch",
            "download",
            "France",
            "Japan_Kanto",
            "--chunk-delay-ms",
            "0",
        ]);
        assert_eq!(cli.chunk_delay_ms, 0);
        match cli.command {
            Some(Commands::Download { ids, resume }) => {
                assert_eq!(ids, vec!["France", "Japan_Kanto"]);
                assert!(!resume);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_locate_flags_conflict() {
        let result = Cli::try_parse_from([
            "mapfetch", "locate", "--lat", "48.8", "--lon", "2.3", "--accept", "--decline",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_locate_accepts_negative_coordinates() {
        let cli = Cli::parse_from(["mapfetch", "locate", "--lat", "-33.9", "--lon", "-70.6"]);
        match cli.command {
            Some(Commands::Locate { lat, lon, accept, decline }) => {
                assert!((lat + 33.9).abs() < f64::EPSILON);
                assert!((lon + 70.6).abs() < f64::EPSILON);
                assert!(!accept && !decline);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_command_is_allowed() {
        let cli = Cli::parse_from(["mapfetch"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.state, PathBuf::from("mapfetch-state.json"));
    }
}
