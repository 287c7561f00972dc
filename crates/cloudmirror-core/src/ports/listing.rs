//! Remote listing port.

use async_trait::async_trait;

use crate::domain::RemoteEntry;
use crate::transfer::ListingError;

/// Lists the direct children of one remote directory.
///
/// The engine walks the tree itself, one directory at a time, so that
/// excluded subtrees are never requested. Implementations may still return
/// nested entries; the engine filters those by path.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// List entries directly under `path` (an absolute remote path, `""` for
    /// the account root).
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, ListingError>;
}
