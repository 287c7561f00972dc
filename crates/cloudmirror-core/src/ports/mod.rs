//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define what the engine expects from the outside world. They use
//! only domain types and contain no transport details.
//!
//! - `listing` - Per-directory listing of the remote tree
//! - `fetch` - Streaming content retrieval for one remote file
//! - `event_emitter` - Non-blocking sink for `TransferEvent`s

pub mod event_emitter;
pub mod fetch;
pub mod listing;

pub use event_emitter::{
    ChannelTransferEmitter, LoggingTransferEmitter, NoopTransferEmitter, TransferEventEmitterPort,
};
pub use fetch::{ByteStream, ContentFetcher};
pub use listing::ListingSource;
