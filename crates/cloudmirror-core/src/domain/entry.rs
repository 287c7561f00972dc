//! Remote listing entries.

use serde::{Deserialize, Serialize};

/// A single entry produced by a listing source.
///
/// Entries are immutable once observed and are not retained beyond task
/// creation. Paths are absolute within the remote account and use `/` as
/// the separator (e.g. `/Photos/2024/img.jpg`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Absolute remote path.
    pub path: String,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Opaque revision/content identifier, if the remote exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl RemoteEntry {
    /// Create a file entry.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size,
            revision: None,
        }
    }

    /// Create a directory entry.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            size: 0,
            revision: None,
        }
    }

    /// Attach a revision identifier.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// The last path segment.
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// The path without its leading separator, suitable for joining onto a
    /// local destination root.
    pub fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}
