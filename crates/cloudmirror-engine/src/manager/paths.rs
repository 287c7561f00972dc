//! Local destination planning and the partial-file guard.
//!
//! Transfers write to `<dest>.part` and rename onto `<dest>` only after the
//! byte count checks out, so a file at the final path is always complete.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use cloudmirror_core::TransferError;

const PART_SUFFIX: &str = ".part";

/// Map a remote path onto the destination root.
///
/// The full remote path is kept (`/Photos/a.jpg` → `<dest>/Photos/a.jpg`).
/// Paths that would escape the root or name nothing are rejected.
pub fn local_path_for(dest_root: &Path, remote_path: &str) -> Result<PathBuf, TransferError> {
    let relative = remote_path.trim_matches('/');
    if relative.is_empty() {
        return Err(TransferError::invalid_path(remote_path));
    }

    let mut local = dest_root.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() {
            continue;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => local.push(name),
            _ => return Err(TransferError::invalid_path(remote_path)),
        }
    }
    Ok(local)
}

/// The temporary path used while `dest` is being written.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(PART_SUFFIX);
    dest.with_file_name(name)
}

/// Size of an existing regular file at `path`, if there is one.
pub async fn existing_size(path: &Path) -> Option<u64> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// Scoped write target for one attempt.
///
/// Opened with truncate, so a retry never appends to stale content. Unless
/// [`PartFile::commit`] succeeds, the part file is removed on drop.
#[derive(Debug)]
pub struct PartFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    committed: bool,
}

impl PartFile {
    /// Create (or truncate) the part file for `dest`, creating parent directories.
    pub async fn create(dest: &Path) -> Result<Self, TransferError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let path = part_path(dest);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Some(file),
            written: 0,
            committed: false,
        })
    }

    /// Append a chunk.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), TransferError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| TransferError::other("part file already closed"))?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Path of the part file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, sync and rename onto `dest`. Returns the bytes written.
    pub async fn commit(mut self, dest: &Path) -> Result<u64, TransferError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        fs::rename(&self.path, dest).await?;
        self.committed = true;
        Ok(self.written)
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.file.take());
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(
                        target: "cloudmirror.engine",
                        path = %self.path.display(),
                        error = %e,
                        "Could not remove partial file"
                    );
                }
            }
        }
    }
}
