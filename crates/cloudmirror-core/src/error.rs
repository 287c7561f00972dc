//! Run-level errors.
//!
//! Anything here ends the run. Per-file failures never surface as a
//! `MirrorError`; they are recorded in the run summary instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::settings::ConfigError;
use crate::transfer::{ListingError, RunSummary};

/// Fatal error for a mirror run.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The listing failed before any accounting was possible.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// The destination root could not be prepared.
    #[error("Destination unavailable at {}: {message}", path.display())]
    Destination {
        /// Destination root.
        path: PathBuf,
        /// Underlying error description.
        message: String,
    },

    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The listing failed mid-run; in-flight tasks drained first.
    #[error("Run aborted: {cause}")]
    Aborted {
        /// What stopped the listing.
        cause: ListingError,
        /// Accounting for everything that reached a terminal state.
        summary: Box<RunSummary>,
    },
}

impl MirrorError {
    /// Create a destination error from an I/O failure.
    pub fn destination(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Destination {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Partial accounting, when the run got far enough to have any.
    #[must_use]
    pub fn partial_summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Aborted { summary, .. } => Some(summary),
            _ => None,
        }
    }
}
