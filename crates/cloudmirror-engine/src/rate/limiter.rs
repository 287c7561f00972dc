//! Adaptive rate limiter.
//!
//! Workers call [`AdaptiveRateLimiter::acquire`] before every request. The
//! call reserves the next start slot under the lock and then sleeps outside
//! it, so a long wait never blocks other workers from reserving their own
//! slots or reporting outcomes.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use cloudmirror_core::RateLimiterConfig;

/// What happened to a paced request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request succeeded.
    Success,
    /// The remote signalled a rate limit.
    RateLimited,
    /// Any other failure. Resets the success streak; leaves the delay alone.
    Failed,
}

/// Snapshot of the limiter's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Current spacing between request starts.
    pub current_delay: Duration,
    /// Successes since the last rate-limit signal, failure or relaxation.
    pub consecutive_successes: u32,
    /// Failures (of any kind) since the last success.
    pub consecutive_failures: u32,
    /// Rate-limit signals inside the burst window.
    pub recent_rate_limits: usize,
    /// Rate-limit signals since construction.
    pub total_rate_limits: u64,
}

#[derive(Debug)]
struct Inner {
    current_delay: Duration,
    consecutive_successes: u32,
    consecutive_failures: u32,
    recent_rate_limits: VecDeque<Instant>,
    total_rate_limits: u64,
    last_slot: Option<Instant>,
}

impl Inner {
    fn fresh(baseline: Duration) -> Self {
        Self {
            current_delay: baseline,
            consecutive_successes: 0,
            consecutive_failures: 0,
            recent_rate_limits: VecDeque::new(),
            total_rate_limits: 0,
            last_slot: None,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.recent_rate_limits.front() {
            if now.duration_since(oldest) > window {
                self.recent_rate_limits.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Shared, adaptive pacing for request starts.
///
/// The delay always stays within `[baseline, ceiling]`.
#[derive(Debug)]
pub struct AdaptiveRateLimiter {
    config: RateLimiterConfig,
    inner: Mutex<Inner>,
}

impl AdaptiveRateLimiter {
    /// Create a limiter starting at the baseline delay.
    pub fn new(config: RateLimiterConfig) -> Self {
        let inner = Inner::fresh(config.baseline);
        Self {
            config,
            inner: Mutex::new(inner),
        }
    }

    /// Wait until this caller may start a request.
    ///
    /// Slots are handed out in call order, each at least `current_delay`
    /// after the previous one.
    pub async fn acquire(&self) {
        let slot = {
            let mut inner = self.inner.lock().await;
            let now = Instant::now();
            let slot = inner
                .last_slot
                .map_or(now, |last| (last + inner.current_delay).max(now));
            inner.last_slot = Some(slot);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }

    /// Feed back the outcome of a paced request.
    pub async fn report(&self, outcome: RequestOutcome) {
        let mut inner = self.inner.lock().await;

        match outcome {
            RequestOutcome::Success => {
                inner.consecutive_failures = 0;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_streak {
                    let relaxed = self.scaled(inner.current_delay, self.config.decrease_factor);
                    if relaxed != inner.current_delay {
                        tracing::debug!(
                            target: "cloudmirror.engine",
                            delay_ms = relaxed.as_millis(),
                            "Relaxing request pacing"
                        );
                    }
                    inner.current_delay = relaxed;
                    inner.consecutive_successes = 0;
                }
            }
            RequestOutcome::RateLimited => {
                let now = Instant::now();
                inner.prune(now, self.config.burst_window);
                inner.recent_rate_limits.push_back(now);
                inner.total_rate_limits += 1;
                inner.consecutive_successes = 0;
                inner.consecutive_failures += 1;

                let burst = inner.recent_rate_limits.len() >= self.config.burst_threshold;
                let factor = if burst {
                    self.config.burst_increase_factor
                } else {
                    self.config.increase_factor
                };
                inner.current_delay = self.scaled(inner.current_delay, factor);

                tracing::warn!(
                    target: "cloudmirror.engine",
                    delay_ms = inner.current_delay.as_millis(),
                    burst,
                    "Rate limited, slowing down"
                );
            }
            RequestOutcome::Failed => {
                inner.consecutive_successes = 0;
                inner.consecutive_failures += 1;
            }
        }
    }

    /// `delay * factor`, kept within `[baseline, ceiling]`.
    ///
    /// Computed in float seconds so an extreme factor saturates at the
    /// ceiling instead of overflowing `Duration`.
    fn scaled(&self, delay: Duration, factor: f64) -> Duration {
        let secs = delay.as_secs_f64() * factor;
        if secs.is_nan() || secs >= self.config.ceiling.as_secs_f64() {
            return self.config.ceiling;
        }
        if secs <= self.config.baseline.as_secs_f64() {
            return self.config.baseline;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(self.config.ceiling)
    }

    /// Current spacing between request starts.
    pub async fn current_delay(&self) -> Duration {
        self.inner.lock().await.current_delay
    }

    /// Snapshot of the full state.
    pub async fn state(&self) -> RateLimiterState {
        let mut inner = self.inner.lock().await;
        inner.prune(Instant::now(), self.config.burst_window);
        RateLimiterState {
            current_delay: inner.current_delay,
            consecutive_successes: inner.consecutive_successes,
            consecutive_failures: inner.consecutive_failures,
            recent_rate_limits: inner.recent_rate_limits.len(),
            total_rate_limits: inner.total_rate_limits,
        }
    }

    /// The configuration this limiter was built with.
    pub const fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn limiter() -> AdaptiveRateLimiter {
        AdaptiveRateLimiter::new(RateLimiterConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate_then_spaced() {
        let limiter = limiter();
        let start = Instant::now();

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_get_distinct_slots() {
        let limiter = Arc::new(limiter());
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        assert!(times[3].duration_since(start) >= Duration::from_millis(150));
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_strictly_increases_delay() {
        let limiter = limiter();
        let before = limiter.current_delay().await;

        limiter.report(RequestOutcome::RateLimited).await;
        let after_one = limiter.current_delay().await;
        assert!(after_one > before);
        assert_eq!(after_one, before.mul_f64(1.5));

        limiter.report(RequestOutcome::RateLimited).await;
        assert!(limiter.current_delay().await > after_one);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_uses_larger_factor() {
        let limiter = limiter();
        limiter.report(RequestOutcome::RateLimited).await;
        limiter.report(RequestOutcome::RateLimited).await;
        let before_burst = limiter.current_delay().await;

        limiter.report(RequestOutcome::RateLimited).await;
        assert_eq!(limiter.current_delay().await, before_burst.mul_f64(2.0));
        assert_eq!(limiter.state().await.recent_rate_limits, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_window_expires() {
        let limiter = limiter();
        limiter.report(RequestOutcome::RateLimited).await;
        limiter.report(RequestOutcome::RateLimited).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.state().await.recent_rate_limits, 0);

        let before = limiter.current_delay().await;
        limiter.report(RequestOutcome::RateLimited).await;
        assert_eq!(limiter.current_delay().await, before.mul_f64(1.5));
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_ceiling() {
        let limiter = limiter();
        for _ in 0..50 {
            limiter.report(RequestOutcome::RateLimited).await;
        }
        assert_eq!(limiter.current_delay().await, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn decreases_only_after_full_streak() {
        let limiter = limiter();
        limiter.report(RequestOutcome::RateLimited).await;
        let raised = limiter.current_delay().await;

        for _ in 0..19 {
            limiter.report(RequestOutcome::Success).await;
            assert_eq!(limiter.current_delay().await, raised);
        }
        limiter.report(RequestOutcome::Success).await;
        let relaxed = limiter.current_delay().await;
        assert!(relaxed < raised);
        assert_eq!(limiter.state().await.consecutive_successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_breaks_streak_without_changing_delay() {
        let limiter = limiter();
        limiter.report(RequestOutcome::RateLimited).await;
        let raised = limiter.current_delay().await;

        for _ in 0..19 {
            limiter.report(RequestOutcome::Success).await;
        }
        limiter.report(RequestOutcome::Failed).await;
        limiter.report(RequestOutcome::Success).await;

        assert_eq!(limiter.current_delay().await, raised);
        let state = limiter.state().await;
        assert_eq!(state.consecutive_successes, 1);
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_drops_below_baseline() {
        let limiter = limiter();
        for _ in 0..200 {
            limiter.report(RequestOutcome::Success).await;
        }
        assert_eq!(limiter.current_delay().await, Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn extreme_factors_saturate_instead_of_overflowing() {
        let limiter = AdaptiveRateLimiter::new(RateLimiterConfig {
            increase_factor: 1e300,
            burst_increase_factor: f64::INFINITY,
            ..RateLimiterConfig::default()
        });

        limiter.report(RequestOutcome::RateLimited).await;
        assert_eq!(limiter.current_delay().await, Duration::from_secs(5));

        limiter.report(RequestOutcome::RateLimited).await;
        limiter.report(RequestOutcome::RateLimited).await;
        assert_eq!(limiter.current_delay().await, Duration::from_secs(5));
        assert_eq!(limiter.state().await.total_rate_limits, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_decrease_factor_stops_at_baseline() {
        let limiter = AdaptiveRateLimiter::new(RateLimiterConfig {
            decrease_factor: 1e-300,
            success_streak: 1,
            ..RateLimiterConfig::default()
        });
        limiter.report(RequestOutcome::RateLimited).await;
        limiter.report(RequestOutcome::Success).await;
        assert_eq!(limiter.current_delay().await, Duration::from_millis(50));
    }
}
