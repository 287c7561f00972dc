//! Directory-backed remote.
//!
//! Treats a local directory (a mounted or synced cloud folder) as the remote
//! account: remote path `/a/b.txt` is `<root>/a/b.txt`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use tokio::fs;
use tokio_util::io::ReaderStream;

use cloudmirror_core::{
    ByteStream, ContentFetcher, ListingError, ListingSource, RemoteEntry, TransferError,
};

/// Serves listings and content from a local directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Serve the tree below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem location of a remote path.
    fn resolve(&self, remote_path: &str) -> PathBuf {
        remote_path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

fn listing_error(path: &str, err: &io::Error) -> ListingError {
    if err.kind() == io::ErrorKind::NotFound {
        ListingError::not_found(path)
    } else {
        ListingError::transport(format!("{path}: {err}"))
    }
}

fn fetch_error(path: &str, err: &io::Error) -> TransferError {
    match err.kind() {
        io::ErrorKind::NotFound => TransferError::not_found(path),
        io::ErrorKind::PermissionDenied => TransferError::permission_denied(format!("{path}: {err}")),
        _ => TransferError::from_io_error(err),
    }
}

#[async_trait]
impl ListingSource for DirectorySource {
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, ListingError> {
        let dir = self.resolve(path);
        let mut reader = fs::read_dir(&dir)
            .await
            .map_err(|e| listing_error(path, &e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| listing_error(path, &e))?
        {
            let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 name");
                continue;
            };
            let remote_path = format!("{path}/{name}");

            // Follows symlinks, like a synced folder would present them.
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %remote_path, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if meta.is_dir() {
                entries.push(RemoteEntry::dir(remote_path));
            } else if meta.is_file() {
                entries.push(RemoteEntry::file(remote_path, meta.len()));
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[async_trait]
impl ContentFetcher for DirectorySource {
    async fn fetch(&self, entry: &RemoteEntry) -> Result<ByteStream, TransferError> {
        let file = fs::File::open(self.resolve(&entry.path))
            .await
            .map_err(|e| fetch_error(&entry.path, &e))?;

        let path = entry.path.clone();
        Ok(ReaderStream::new(file)
            .map_err(move |e| fetch_error(&path, &e))
            .boxed())
    }
}

/// Check that `root` is a readable directory.
pub async fn ensure_source(root: &Path) -> io::Result<()> {
    let meta = fs::metadata(root).await?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", root.display()),
        ))
    }
}
