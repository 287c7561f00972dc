//! Progress event throttling.

use std::time::Duration;

use tokio::time::Instant;

/// Limits how often a single transfer emits progress events.
///
/// The first check always passes; after that at most one check per
/// `min_interval` does, except when the transfer reaches its total.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum interval.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Whether a progress event for `downloaded` of `total` bytes should go out now.
    pub fn should_emit(&mut self, downloaded: u64, total: u64) -> bool {
        let now = Instant::now();
        let due = self
            .last_emit
            .is_none_or(|last| now.duration_since(last) >= self.min_interval);
        if due || (total > 0 && downloaded >= total) {
            self.last_emit = Some(now);
            true
        } else {
            false
        }
    }

    /// Make the next check pass (used when a new attempt starts).
    pub const fn reset(&mut self) {
        self.last_emit = None;
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
