//! Engine configuration and validation.
//!
//! Pure data with serde support; loading it (flags, environment, files) is
//! the caller's business. Durations serialize as integer milliseconds.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of concurrent transfer workers.
pub const DEFAULT_WORKERS: usize = 6;

/// Upper bound on concurrent workers.
pub const MAX_WORKERS: usize = 20;

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Worker count must be between 1 and {MAX_WORKERS}, got {0}")]
    InvalidWorkers(usize),

    #[error("Destination directory is required")]
    EmptyDestination,

    #[error("Invalid rate limiter setting: {0}")]
    InvalidRateLimiter(String),

    #[error("Invalid retry setting: {0}")]
    InvalidRetry(String),

    #[error("Invalid filter setting: {0}")]
    InvalidFilter(String),

    #[error("Idle timeout must be greater than zero")]
    InvalidIdleTimeout,

    #[error("Invalid size '{0}' (expected e.g. 500MB, 1.5GB, 1024)")]
    InvalidSize(String),
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Adaptive rate limiter tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Minimum spacing between request starts.
    #[serde(with = "duration_ms")]
    pub baseline: Duration,
    /// Maximum spacing between request starts.
    #[serde(with = "duration_ms")]
    pub ceiling: Duration,
    /// Multiplier applied on an isolated rate-limit signal.
    pub increase_factor: f64,
    /// Multiplier applied when rate-limit signals arrive in a burst.
    pub burst_increase_factor: f64,
    /// Number of signals inside `burst_window` that counts as a burst.
    pub burst_threshold: usize,
    /// Trailing window for burst detection.
    #[serde(with = "duration_ms")]
    pub burst_window: Duration,
    /// Consecutive successes required before the delay relaxes.
    pub success_streak: u32,
    /// Multiplier applied after a full success streak.
    pub decrease_factor: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            baseline: Duration::from_millis(50),
            ceiling: Duration::from_secs(5),
            increase_factor: 1.5,
            burst_increase_factor: 2.0,
            burst_threshold: 3,
            burst_window: Duration::from_secs(60),
            success_streak: 20,
            decrease_factor: 0.9,
        }
    }
}

impl RateLimiterConfig {
    /// Set the baseline delay.
    #[must_use]
    pub const fn with_baseline(mut self, baseline: Duration) -> Self {
        self.baseline = baseline;
        self
    }

    /// Set the ceiling delay.
    #[must_use]
    pub const fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Set the success streak length.
    #[must_use]
    pub const fn with_success_streak(mut self, streak: u32) -> Self {
        self.success_streak = streak;
        self
    }

    /// Check the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |msg: &str| Err(ConfigError::InvalidRateLimiter(msg.to_string()));

        if self.baseline.is_zero() {
            return bad("baseline must be greater than zero");
        }
        if self.ceiling < self.baseline {
            return bad("ceiling must not be below baseline");
        }
        if !self.increase_factor.is_finite() || self.increase_factor <= 1.0 {
            return bad("increase_factor must be a finite number greater than 1");
        }
        if !self.burst_increase_factor.is_finite()
            || self.burst_increase_factor < self.increase_factor
        {
            return bad("burst_increase_factor must be finite and at least increase_factor");
        }
        if !self.decrease_factor.is_finite()
            || self.decrease_factor <= 0.0
            || self.decrease_factor >= 1.0
        {
            return bad("decrease_factor must be between 0 and 1 (exclusive)");
        }
        if self.burst_threshold == 0 {
            return bad("burst_threshold must be at least 1");
        }
        if self.success_streak == 0 {
            return bad("success_streak must be at least 1");
        }
        Ok(())
    }
}

/// Retry and backoff tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per file, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// Growth factor per attempt.
    pub backoff_factor: f64,
    /// Cap for any single delay, jitter included.
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    /// Jitter as a fraction of the computed delay, in `[0, 1]`.
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
            jitter_ratio: 0.25,
        }
    }
}

impl RetryConfig {
    /// Set the attempt ceiling.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set base and cap delays.
    #[must_use]
    pub const fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    /// Set the jitter ratio.
    #[must_use]
    pub const fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    /// Check the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |msg: &str| Err(ConfigError::InvalidRetry(msg.to_string()));

        if self.max_attempts == 0 {
            return bad("max_attempts must be at least 1");
        }
        if self.base_delay > self.max_delay {
            return bad("base_delay must not exceed max_delay");
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return bad("backoff_factor must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return bad("jitter_ratio must be between 0 and 1");
        }
        Ok(())
    }
}

/// Folder and file filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Prune the built-in dependency/build/VCS folder set.
    pub skip_dependencies: bool,
    /// Extra folder names to prune, on top of the built-in set.
    pub extra_skip_dirs: Vec<String>,
    /// Folder name prefixes to prune (e.g. `"."` for hidden folders).
    pub skip_prefixes: Vec<String>,
    /// Only mirror files with these extensions (empty = all).
    pub include_extensions: Vec<String>,
    /// Never mirror files with these extensions.
    pub exclude_extensions: Vec<String>,
    /// Minimum file size in bytes.
    pub min_size: u64,
    /// Maximum file size in bytes (0 = no limit).
    pub max_size: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            skip_dependencies: true,
            extra_skip_dirs: Vec::new(),
            skip_prefixes: Vec::new(),
            include_extensions: Vec::new(),
            exclude_extensions: Vec::new(),
            min_size: 0,
            max_size: 0,
        }
    }
}

impl FilterConfig {
    /// Check the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size > 0 && self.min_size > self.max_size {
            return Err(ConfigError::InvalidFilter(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.skip_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidFilter(
                "skip prefixes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for one mirror run.
///
/// # Example
///
/// ```
/// use cloudmirror_core::MirrorConfig;
///
/// let config = MirrorConfig::new("/Photos", "/mnt/backup")
///     .with_workers(8)
///     .with_max_bytes_per_run(10 * 1024 * 1024 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Remote directory to mirror (`""` = account root).
    pub remote_root: String,
    /// Local directory that receives the mirror.
    pub dest_root: PathBuf,
    /// Maximum concurrent transfers.
    pub workers: usize,
    /// Byte budget for this run (0 = unlimited).
    pub max_bytes_per_run: u64,
    /// Plan only; never fetch.
    pub dry_run: bool,
    /// Minimum spacing between per-file progress events.
    #[serde(with = "duration_ms")]
    pub progress_interval: Duration,
    /// Longest wait for the next chunk of a stream before the attempt fails.
    #[serde(with = "duration_ms")]
    pub idle_timeout: Duration,
    /// Rate limiter tuning.
    pub rate_limiter: RateLimiterConfig,
    /// Retry tuning.
    pub retry: RetryConfig,
    /// Filters.
    pub filter: FilterConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            remote_root: String::new(),
            dest_root: PathBuf::new(),
            workers: DEFAULT_WORKERS,
            max_bytes_per_run: 0,
            dry_run: false,
            progress_interval: Duration::from_millis(100),
            idle_timeout: Duration::from_secs(300),
            rate_limiter: RateLimiterConfig::default(),
            retry: RetryConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// Create a configuration with defaults for the given roots.
    pub fn new(remote_root: impl AsRef<str>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: normalize_remote_path(remote_root.as_ref()),
            dest_root: dest_root.into(),
            ..Self::default()
        }
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the per-run byte budget (0 = unlimited).
    #[must_use]
    pub const fn with_max_bytes_per_run(mut self, max_bytes: u64) -> Self {
        self.max_bytes_per_run = max_bytes;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the progress event interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the per-chunk idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Replace the rate limiter tuning.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiterConfig) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Replace the retry tuning.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the filters.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WORKERS).contains(&self.workers) {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }
        if self.dest_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDestination);
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::InvalidIdleTimeout);
        }
        self.rate_limiter.validate()?;
        self.retry.validate()?;
        self.filter.validate()
    }
}

/// Parse a human-readable size (`"100"`, `"1KB"`, `"1.5GB"`) into bytes.
///
/// Units are binary (1 KB = 1024 bytes) and case-insensitive.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
    const UNITS: [(&str, u64); 9] = [
        ("TB", 1 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
        ("KB", 1 << 10),
        ("T", 1 << 40),
        ("G", 1 << 30),
        ("M", 1 << 20),
        ("K", 1 << 10),
        ("B", 1),
    ];

    let invalid = || ConfigError::InvalidSize(input.to_string());
    let normalized = input.trim().to_ascii_uppercase();

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| {
            normalized
                .strip_suffix(suffix)
                .map(|rest| (rest.trim(), *mult))
        })
        .unwrap_or((normalized.as_str(), 1));

    let value: f64 = number.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }

    let bytes = value * multiplier as f64;
    if bytes > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes as u64)
}

/// Normalize a remote path: leading `/`, no trailing `/`, `""` for the root.
pub fn normalize_remote_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MirrorConfig::new("", "/tmp/out");
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, 6);
        assert_eq!(config.max_bytes_per_run, 0);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.rate_limiter.baseline, Duration::from_millis(50));
    }

    #[test]
    fn test_worker_bounds() {
        let base = MirrorConfig::new("", "/tmp/out");
        assert_eq!(
            base.clone().with_workers(0).validate(),
            Err(ConfigError::InvalidWorkers(0))
        );
        assert_eq!(
            base.clone().with_workers(21).validate(),
            Err(ConfigError::InvalidWorkers(21))
        );
        assert!(base.with_workers(20).validate().is_ok());
    }

    #[test]
    fn test_empty_destination_rejected() {
        assert_eq!(
            MirrorConfig::default().validate(),
            Err(ConfigError::EmptyDestination)
        );
    }

    #[test]
    fn test_rate_limiter_validation() {
        let zero = RateLimiterConfig::default().with_baseline(Duration::ZERO);
        assert!(zero.validate().is_err());

        let inverted = RateLimiterConfig::default()
            .with_baseline(Duration::from_secs(2))
            .with_ceiling(Duration::from_secs(1));
        assert!(inverted.validate().is_err());

        let flat = RateLimiterConfig {
            increase_factor: 1.0,
            ..RateLimiterConfig::default()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_rate_limiter_rejects_non_finite_factors() {
        let infinite = RateLimiterConfig {
            increase_factor: f64::INFINITY,
            burst_increase_factor: f64::INFINITY,
            ..RateLimiterConfig::default()
        };
        assert!(infinite.validate().is_err());

        let infinite_burst = RateLimiterConfig {
            burst_increase_factor: f64::INFINITY,
            ..RateLimiterConfig::default()
        };
        assert!(infinite_burst.validate().is_err());

        let nan_decrease = RateLimiterConfig {
            decrease_factor: f64::NAN,
            ..RateLimiterConfig::default()
        };
        assert!(nan_decrease.validate().is_err());

        let huge = RateLimiterConfig {
            increase_factor: 1e300,
            burst_increase_factor: 1e300,
            ..RateLimiterConfig::default()
        };
        assert!(huge.validate().is_ok());
    }

    #[test]
    fn test_retry_validation() {
        assert!(RetryConfig::default().with_max_attempts(0).validate().is_err());
        assert!(
            RetryConfig::default()
                .with_delays(Duration::from_secs(10), Duration::from_secs(1))
                .validate()
                .is_err()
        );
        assert!(RetryConfig::default().with_jitter_ratio(1.5).validate().is_err());
        assert!(RetryConfig::default().with_jitter_ratio(1.0).validate().is_ok());
    }

    #[test]
    fn test_filter_validation() {
        let filter = FilterConfig {
            min_size: 100,
            max_size: 10,
            ..FilterConfig::default()
        };
        assert!(filter.validate().is_err());

        let unbounded = FilterConfig {
            min_size: 100,
            max_size: 0,
            ..FilterConfig::default()
        };
        assert!(unbounded.validate().is_ok());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("1KB"), Ok(1024));
        assert_eq!(parse_size("1k"), Ok(1024));
        assert_eq!(parse_size("1.5MB"), Ok(1_572_864));
        assert_eq!(parse_size(" 2 GB "), Ok(2_147_483_648));
        assert_eq!(parse_size("1T"), Ok(1 << 40));
        assert_eq!(parse_size("12B"), Ok(12));
        assert!(parse_size("lots").is_err());
        assert!(parse_size("-1MB").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_normalize_remote_path() {
        assert_eq!(normalize_remote_path(""), "");
        assert_eq!(normalize_remote_path("/"), "");
        assert_eq!(normalize_remote_path("Photos"), "/Photos");
        assert_eq!(normalize_remote_path("/Photos/2024/"), "/Photos/2024");
        assert_eq!(normalize_remote_path("  /Docs "), "/Docs");
    }

    #[test]
    fn test_serde_durations_in_millis() {
        let config = MirrorConfig::new("/a", "/b");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["progress_interval"], 100);
        assert_eq!(json["rate_limiter"]["ceiling"], 5000);

        let partial: MirrorConfig =
            serde_json::from_str(r#"{"dest_root":"/x","workers":3,"retry":{"max_attempts":2}}"#)
                .unwrap();
        assert_eq!(partial.workers, 3);
        assert_eq!(partial.retry.max_attempts, 2);
        assert_eq!(partial.retry.base_delay, Duration::from_secs(1));
        assert!(partial.validate().is_ok());
    }
}
