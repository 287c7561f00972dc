//! Adaptive pacing of request starts.
//!
//! One limiter is shared by every worker in a run. It spaces request starts
//! by a delay that grows on rate-limit signals and relaxes after a streak of
//! successes.

mod limiter;

pub use limiter::{AdaptiveRateLimiter, RateLimiterState, RequestOutcome};
