//! Transfer outcome types shared by the engine and its adapters.
//!
//! No I/O here; everything is plain data that serializes cleanly.
//!
//! # Structure
//!
//! - `errors` - Per-file failure taxonomy (`TransferError`, `FailureKind`) and `ListingError`
//! - `events` - Events emitted while a run progresses (`TransferEvent`)
//! - `summary` - End-of-run accounting (`RunSummary`, `RunOutcome`, `FailedTransfer`)

pub mod errors;
pub mod events;
pub mod summary;

pub use errors::{FailureKind, ListingError, TransferError, classify_status};
pub use events::TransferEvent;
pub use summary::{FailedTransfer, RunOutcome, RunSummary};
