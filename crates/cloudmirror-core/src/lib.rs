//! Core domain types and port definitions for cloudmirror.
//!
//! This crate holds everything the orchestration engine and its adapters
//! agree on, with no runtime I/O:
//!
//! - `domain` - Remote entries and transfer tasks with their state machine
//! - `transfer` - Failure taxonomy, transfer events and run summaries
//! - `filter` - Folder pruning and per-file filters
//! - `settings` - Engine configuration and validation
//! - `ports` - Collaborator traits (listing, content fetch, event emission)
//! - `error` - Run-level (fatal) errors

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod filter;
pub mod ports;
pub mod settings;
pub mod transfer;

// Re-export commonly used types for convenience
pub use domain::{RemoteEntry, SkipReason, TransferStatus, TransferTask};
pub use error::MirrorError;
pub use filter::{DEFAULT_SKIP_DIRS, FileFilter, FileRejection, FolderFilter, parse_extensions};
pub use ports::{
    ByteStream, ChannelTransferEmitter, ContentFetcher, ListingSource, LoggingTransferEmitter,
    NoopTransferEmitter, TransferEventEmitterPort,
};
pub use settings::{
    ConfigError, FilterConfig, MirrorConfig, RateLimiterConfig, RetryConfig,
    normalize_remote_path, parse_size,
};
pub use transfer::{
    FailedTransfer, FailureKind, ListingError, RunOutcome, RunSummary, TransferError,
    TransferEvent, classify_status,
};
