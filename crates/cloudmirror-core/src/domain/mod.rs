//! Domain types for the mirror engine.
//!
//! - `entry` - `RemoteEntry`, as observed from the listing source
//! - `task` - `TransferTask` and its status state machine

mod entry;
mod task;

pub use entry::RemoteEntry;
pub use task::{SkipReason, TransferStatus, TransferTask};
