//! Retry policy with capped exponential backoff and jitter.

use std::time::Duration;

use cloudmirror_core::{FailureKind, RetryConfig};
use rand::Rng;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then try again.
    Retry {
        /// Time to wait before the next attempt.
        delay: Duration,
    },
    /// Stop; the task ends `Failed`.
    GiveUp,
}

/// Decides whether and when a failed transfer is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy from its configuration.
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts allowed per task.
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Decide after `attempt` (1-based) failed with `kind`.
    ///
    /// A server hint replaces the computed delay when it is longer; the
    /// result never exceeds `max_delay`.
    pub fn decide(
        &self,
        attempt: u32,
        kind: FailureKind,
        server_hint: Option<Duration>,
    ) -> RetryDecision {
        if !kind.is_retryable() || attempt >= self.config.max_attempts {
            return RetryDecision::GiveUp;
        }

        let unit: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        let computed = self.delay_with_jitter(attempt, unit);
        let delay = server_hint
            .map_or(computed, |hint| hint.max(computed))
            .min(self.config.max_delay);

        RetryDecision::Retry { delay }
    }

    /// Backoff for `attempt` without jitter: `min(max, base * factor^(attempt-1))`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.config.base_delay.as_secs_f64() * self.config.backoff_factor.powi(exponent);
        let cap = self.config.max_delay.as_secs_f64();

        if !scaled.is_finite() || scaled >= cap {
            self.config.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Backoff plus a jitter term, capped.
    ///
    /// `unit` is clamped to `[0, 1]`; the result lies in
    /// `[backoff, min(max, backoff * (1 + jitter_ratio))]`, bounds inclusive.
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let backoff = self.backoff(attempt);
        let jitter = backoff.mul_f64(unit.clamp(0.0, 1.0) * self.config.jitter_ratio);
        (backoff + jitter).min(self.config.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(RetryConfig::default())
    }

    #[test]
    fn backoff_doubles_from_base() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
        assert_eq!(p.backoff(3), Duration::from_secs(4));
        assert_eq!(p.backoff(4), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_monotonic_and_capped() {
        let p = policy();
        let mut previous = Duration::ZERO;
        for attempt in 1..=200 {
            let delay = p.backoff(attempt);
            assert!(delay >= previous, "attempt {attempt}");
            assert!(delay <= Duration::from_secs(60));
            previous = delay;
        }
        assert_eq!(p.backoff(200), Duration::from_secs(60));
        assert_eq!(p.backoff(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn jitter_bounds_are_inclusive() {
        let p = policy();
        assert_eq!(p.delay_with_jitter(3, 0.0), Duration::from_secs(4));
        assert_eq!(p.delay_with_jitter(3, 1.0), Duration::from_secs(5));
        let mid = p.delay_with_jitter(3, 0.5);
        assert!(mid > Duration::from_secs(4) && mid < Duration::from_secs(5));
    }

    #[test]
    fn jitter_never_exceeds_cap() {
        let p = policy();
        assert_eq!(p.delay_with_jitter(7, 1.0), Duration::from_secs(60));
        assert_eq!(p.delay_with_jitter(6, 1.0), Duration::from_secs(40));
        assert_eq!(p.delay_with_jitter(50, 0.3), Duration::from_secs(60));
    }

    #[test]
    fn permanent_never_retries() {
        let p = policy();
        assert_eq!(p.decide(1, FailureKind::Permanent, None), RetryDecision::GiveUp);
    }

    #[test]
    fn transient_retries_until_ceiling() {
        let p = policy();
        for attempt in 1..5 {
            match p.decide(attempt, FailureKind::Transient, None) {
                RetryDecision::Retry { delay } => {
                    assert!(delay >= p.backoff(attempt));
                    assert!(delay <= p.delay_with_jitter(attempt, 1.0));
                }
                RetryDecision::GiveUp => panic!("gave up early at attempt {attempt}"),
            }
        }
        assert_eq!(p.decide(5, FailureKind::Transient, None), RetryDecision::GiveUp);
        assert_eq!(p.decide(5, FailureKind::Unknown, None), RetryDecision::GiveUp);
    }

    #[test]
    fn unknown_is_retried() {
        assert!(matches!(
            policy().decide(1, FailureKind::Unknown, None),
            RetryDecision::Retry { .. }
        ));
    }

    #[test]
    fn server_hint_extends_but_stays_capped() {
        let p = policy();
        assert_eq!(
            p.decide(1, FailureKind::Transient, Some(Duration::from_secs(30))),
            RetryDecision::Retry {
                delay: Duration::from_secs(30)
            }
        );
        assert_eq!(
            p.decide(1, FailureKind::Transient, Some(Duration::from_secs(600))),
            RetryDecision::Retry {
                delay: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn single_attempt_config_never_retries() {
        let p = RetryPolicy::new(RetryConfig::default().with_max_attempts(1));
        assert_eq!(p.decide(1, FailureKind::Transient, None), RetryDecision::GiveUp);
    }
}
