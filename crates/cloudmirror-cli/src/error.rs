//! CLI-specific error types and mappings.
//!
//! Maps run-level errors onto exit codes and user-facing messages.

use cloudmirror_core::{ConfigError, MirrorError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid arguments or settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source or destination not usable.
    #[error("IO error: {0}")]
    Io(String),

    /// The run stopped because the listing failed.
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// Some files failed and `--allow-failures` was not given.
    #[error("{0} file(s) failed")]
    Failures(u64),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error (aborted run)
    /// - 2: Some files failed (unless `--allow-failures`)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Aborted(_) => 1,
            Self::Failures(_) => 2,
            Self::Io(_) => 74,     // EX_IOERR
            Self::Config(_) => 78, // EX_CONFIG
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<MirrorError> for CliError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::Config(config) => Self::Config(config.to_string()),
            MirrorError::Destination { .. } => Self::Io(err.to_string()),
            MirrorError::Listing(cause) | MirrorError::Aborted { cause, .. } => {
                Self::Aborted(cause.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
