//! Content fetch port.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::domain::RemoteEntry;
use crate::transfer::TransferError;

/// Byte stream of one remote file's content.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransferError>>;

/// Opens a content stream for a remote file.
///
/// Errors must be classified at this boundary: the implementation maps its
/// transport failures onto `TransferError` variants (with status codes where
/// available) so that `TransferError::kind()` can decide retryability.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Start fetching `entry`. The stream should yield exactly
    /// `entry.size` bytes.
    async fn fetch(&self, entry: &RemoteEntry) -> Result<ByteStream, TransferError>;
}
