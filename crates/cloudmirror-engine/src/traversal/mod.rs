//! Lazy, pruning traversal of the remote tree.
//!
//! The walker lists one directory at a time and hands out files one by one,
//! so memory tracks directory fan-out rather than the size of the account.
//! Directories rejected by the folder filter are never listed.

use std::collections::VecDeque;
use std::sync::Arc;

use cloudmirror_core::{FolderFilter, ListingError, ListingSource, RemoteEntry};

/// Counters collected while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories actually listed.
    pub directories_listed: u64,
    /// Directories pruned by the folder filter.
    pub pruned_directories: u64,
    /// Files below a pruned directory that a listing returned anyway.
    pub pruned_files: u64,
    /// Files handed out.
    pub files_yielded: u64,
}

/// Depth-first producer of file entries.
///
/// Finite and not restartable: once `next_file` returns `Ok(None)` it keeps
/// doing so.
pub struct TreeWalker {
    source: Arc<dyn ListingSource>,
    filter: FolderFilter,
    root: String,
    pending_dirs: Vec<String>,
    current_files: VecDeque<RemoteEntry>,
    stats: WalkStats,
}

impl TreeWalker {
    /// Start a walk at `root` (a normalized remote path, `""` for the account root).
    pub fn new(
        source: Arc<dyn ListingSource>,
        filter: FolderFilter,
        root: impl Into<String>,
    ) -> Self {
        let root = root.into();
        Self {
            source,
            filter,
            pending_dirs: vec![root.clone()],
            root,
            current_files: VecDeque::new(),
            stats: WalkStats::default(),
        }
    }

    /// The next file, listing further directories as needed.
    ///
    /// A listing error is returned as-is; the caller decides whether the walk
    /// continues.
    pub async fn next_file(&mut self) -> Result<Option<RemoteEntry>, ListingError> {
        loop {
            if let Some(file) = self.current_files.pop_front() {
                self.stats.files_yielded += 1;
                return Ok(Some(file));
            }

            let Some(dir) = self.pending_dirs.pop() else {
                return Ok(None);
            };

            tracing::debug!(target: "cloudmirror.engine", path = %dir, "Listing directory");
            let entries = self.source.list_directory(&dir).await?;
            self.stats.directories_listed += 1;
            self.absorb(entries);
        }
    }

    /// Counters so far.
    pub const fn stats(&self) -> WalkStats {
        self.stats
    }

    fn absorb(&mut self, entries: Vec<RemoteEntry>) {
        let mut subdirs = Vec::new();

        for mut entry in entries {
            if entry.is_dir {
                let path = entry.path.trim_end_matches('/').to_string();
                if self.filter.should_skip(entry.name())
                    || self.filter.excludes_path(self.relative(&path))
                {
                    tracing::debug!(target: "cloudmirror.engine", path = %path, "Pruned directory");
                    self.stats.pruned_directories += 1;
                } else {
                    subdirs.push(path);
                }
            } else if self.filter.excludes_path(self.relative(&entry.path)) {
                self.stats.pruned_files += 1;
            } else {
                entry.path = entry.path.trim_end_matches('/').to_string();
                self.current_files.push_back(entry);
            }
        }

        // Reversed so the stack pops them in listing order.
        self.pending_dirs.extend(subdirs.into_iter().rev());
    }

    fn relative<'p>(&self, path: &'p str) -> &'p str {
        path.strip_prefix(self.root.as_str()).unwrap_or(path)
    }
}

impl std::fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("root", &self.root)
            .field("pending_dirs", &self.pending_dirs.len())
            .field("current_files", &self.current_files.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
