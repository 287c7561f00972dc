//! Download orchestration for cloudmirror.
//!
//! Given a listing port, a content port and a `MirrorConfig`, the engine
//! walks the remote tree and mirrors every accepted file to local disk:
//!
//! - `traversal` - Lazy depth-first walk with folder pruning
//! - `rate` - Adaptive limiter shared by all workers
//! - `retry` - Exponential backoff with jitter
//! - `quota` - Per-run byte budget
//! - `progress` - Run-wide aggregation and event throttling
//! - `manager` - Scheduler, workers and run accounting

#![deny(unused_crate_dependencies)]

// Dev-dependencies only used by the integration tests
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;

// Re-export core types for convenience
pub use cloudmirror_core::{
    MirrorConfig, MirrorError, RunOutcome, RunSummary, TransferEvent, TransferEventEmitterPort,
};

pub mod manager;
pub mod progress;
pub mod quota;
pub mod rate;
pub mod retry;
pub mod traversal;

pub use manager::{MirrorEngine, MirrorEngineDeps, RunLedger};
pub use progress::{ActiveTransferSnapshot, ProgressAggregator, ProgressSnapshot, ProgressThrottle};
pub use quota::RunQuota;
pub use rate::{AdaptiveRateLimiter, RateLimiterState, RequestOutcome};
pub use retry::{RetryDecision, RetryPolicy};
pub use traversal::{TreeWalker, WalkStats};
