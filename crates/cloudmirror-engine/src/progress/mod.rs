//! Progress tracking and throttling.
//!
//! - `aggregator` - Run-wide counters and the pull-based `ProgressSnapshot`
//! - `throttle` - Rate-limits per-transfer progress events

mod aggregator;
mod throttle;

pub use aggregator::{
    ActiveTransferSnapshot, ProgressAggregator, ProgressSnapshot, TransferProgress,
};
pub use throttle::ProgressThrottle;
