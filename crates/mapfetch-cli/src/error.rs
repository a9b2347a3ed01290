//! CLI-specific error types and mappings.
//!
//! Maps library errors to exit codes and user-facing messages.

use mapfetch_core::{CatalogError, ConfigError, RepositoryError, StorageError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The orchestrator rejected a request.
    #[error("{0}")]
    Storage(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// The catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO error (state file unreadable or unwritable).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A download or the bootstrap ended in failure.
    #[error("Download failed: {0}")]
    Download(String),

    /// The user interrupted the run.
    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Terminated by Ctrl-C
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Storage(_) | Self::Download(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Catalog(_) => 65,  // EX_DATAERR
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Interrupted => 130,
        }
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownNode { .. } | StorageError::NotALeaf { .. } => {
                Self::Arguments(err.user_message())
            }
            other => Self::Storage(other.user_message()),
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<RepositoryError> for CliError {
    fn from(err: RepositoryError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapfetch_core::{BootstrapPhase, ErrorCode};

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Storage("x".into()).exit_code(), 1);
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Catalog("x".into()).exit_code(), 65);
        assert_eq!(CliError::Io("x".into()).exit_code(), 74);
        assert_eq!(CliError::Config("x".into()).exit_code(), 78);
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_unknown_node_is_an_argument_error() {
        let err: CliError = StorageError::unknown_node("Atlantis").into();
        assert!(matches!(err, CliError::Arguments(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_storage_errors_keep_user_message() {
        let engine = StorageError::engine(ErrorCode::NotEnoughFreeSpace);
        let message = engine.user_message();
        let err: CliError = engine.into();
        assert_eq!(err.to_string(), message);

        let phase: CliError = StorageError::invalid_phase(BootstrapPhase::Complete, "retry").into();
        assert!(matches!(phase, CliError::Storage(_)));
    }

    #[test]
    fn test_config_error_mapping() {
        let err: CliError = ConfigError::InvalidCommandBuffer(0).into();
        assert_eq!(err.exit_code(), 78);
        assert!(err.to_string().contains("Command buffer"));
    }
}
