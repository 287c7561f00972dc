//! Run-wide progress aggregation.
//!
//! Counters are atomics. The active-transfer map and the speed window each
//! sit behind a short `std::sync::Mutex`; neither lock is held across an
//! await or while touching the network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use cloudmirror_core::{SkipReason, TransferStatus};

/// Default trailing window for speed calculation.
const DEFAULT_SPEED_WINDOW: Duration = Duration::from_secs(5);

/// Live byte counter for one in-flight transfer.
#[derive(Debug)]
pub struct TransferProgress {
    path: String,
    total: u64,
    downloaded: AtomicU64,
    attempt: AtomicU32,
}

impl TransferProgress {
    /// Bytes written in the current attempt.
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// Remote path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// One in-flight transfer as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTransferSnapshot {
    /// Remote path.
    pub path: String,
    /// Bytes written in the current attempt.
    pub downloaded: u64,
    /// Expected size.
    pub total: u64,
    /// Current attempt number.
    pub attempt: u32,
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Tasks created so far.
    pub total_files: u64,
    /// Tasks that reached a terminal state.
    pub completed_files: u64,
    /// Of which succeeded.
    pub succeeded_files: u64,
    /// Of which skipped (any reason).
    pub skipped_files: u64,
    /// Of which failed.
    pub failed_files: u64,
    /// Transfers currently owned by a worker.
    pub active_workers: usize,
    /// Bytes written by finished and in-flight transfers.
    pub bytes_done: u64,
    /// Sum of expected sizes of all tasks created so far.
    pub bytes_total_estimate: u64,
    /// Bytes of files skipped because they were already present.
    pub bytes_skipped: u64,
    /// Trailing-window transfer speed.
    pub speed_bps: f64,
    /// Estimated time to finish, when the speed allows an estimate.
    pub eta: Option<Duration>,
    /// Time since the aggregator was created.
    pub elapsed: Duration,
    /// Retries scheduled so far.
    pub retries: u64,
    /// Rate-limit signals seen so far.
    pub rate_limit_hits: u64,
    /// Whether the listing is exhausted (totals are final).
    pub discovery_complete: bool,
    /// In-flight transfers, ordered by path.
    pub active: Vec<ActiveTransferSnapshot>,
}

impl ProgressSnapshot {
    /// Percentage of the byte estimate that is done or skipped.
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.bytes_total_estimate == 0 {
            return 0.0;
        }
        let settled = self.bytes_done.saturating_add(self.bytes_skipped);
        (settled as f64 / self.bytes_total_estimate as f64 * 100.0).min(100.0)
    }
}

/// Collects progress from the scheduler and workers.
#[derive(Debug)]
pub struct ProgressAggregator {
    started: Instant,
    speed_window: Duration,

    total_files: AtomicU64,
    succeeded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,

    bytes_done: AtomicU64,
    bytes_transferred: AtomicU64,
    bytes_total_estimate: AtomicU64,
    bytes_skipped: AtomicU64,
    bytes_dropped: AtomicU64,

    retries: AtomicU64,
    rate_limit_hits: AtomicU64,
    discovery_complete: AtomicBool,

    active: Mutex<HashMap<u64, Arc<TransferProgress>>>,
    samples: Mutex<VecDeque<(Instant, u64)>>,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAggregator {
    /// Create an aggregator with the default 5 s speed window.
    pub fn new() -> Self {
        Self::with_speed_window(DEFAULT_SPEED_WINDOW)
    }

    /// Create an aggregator with a custom speed window.
    pub fn with_speed_window(speed_window: Duration) -> Self {
        Self {
            started: Instant::now(),
            speed_window,
            total_files: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes_done: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            bytes_total_estimate: AtomicU64::new(0),
            bytes_skipped: AtomicU64::new(0),
            bytes_dropped: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            rate_limit_hits: AtomicU64::new(0),
            discovery_complete: AtomicBool::new(false),
            active: Mutex::new(HashMap::new()),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// A task was created for a file of `size` bytes.
    pub fn task_created(&self, size: u64) {
        self.total_files.fetch_add(1, Ordering::Relaxed);
        self.bytes_total_estimate.fetch_add(size, Ordering::Relaxed);
    }

    /// The listing is exhausted; no more tasks will be created.
    pub fn discovery_finished(&self) {
        self.discovery_complete.store(true, Ordering::Relaxed);
    }

    /// A worker took ownership of task `id`.
    pub fn transfer_started(&self, id: u64, path: &str, total: u64) -> Arc<TransferProgress> {
        let progress = Arc::new(TransferProgress {
            path: path.to_string(),
            total,
            downloaded: AtomicU64::new(0),
            attempt: AtomicU32::new(0),
        });
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&progress));
        progress
    }

    /// A new attempt starts; bytes from the previous one no longer count.
    pub fn attempt_started(&self, progress: &TransferProgress, attempt: u32) {
        progress.attempt.store(attempt, Ordering::Relaxed);
        let stale = progress.downloaded.swap(0, Ordering::Relaxed);
        self.bytes_done.fetch_sub(stale, Ordering::Relaxed);
    }

    /// `n` more bytes were written for this transfer.
    pub fn add_bytes(&self, progress: &TransferProgress, n: u64) {
        progress.downloaded.fetch_add(n, Ordering::Relaxed);
        self.bytes_done.fetch_add(n, Ordering::Relaxed);
        self.bytes_transferred.fetch_add(n, Ordering::Relaxed);
    }

    /// A retry was scheduled.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// The remote signalled a rate limit.
    pub fn record_rate_limit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Task `id` reached a terminal status after being dispatched.
    pub fn transfer_finished(&self, id: u64, status: TransferStatus, expected_size: u64) {
        let removed = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        if status != TransferStatus::Succeeded {
            if let Some(progress) = removed {
                let partial = progress.downloaded.swap(0, Ordering::Relaxed);
                self.bytes_done.fetch_sub(partial, Ordering::Relaxed);
            }
        }
        self.record_terminal(status, expected_size);
    }

    /// A task ended without ever being dispatched.
    pub fn task_skipped(&self, reason: SkipReason, expected_size: u64) {
        self.record_terminal(TransferStatus::Skipped(reason), expected_size);
    }

    /// A task failed before it could be dispatched.
    pub fn task_failed(&self, expected_size: u64) {
        self.record_terminal(TransferStatus::Failed, expected_size);
    }

    fn record_terminal(&self, status: TransferStatus, expected_size: u64) {
        match status {
            TransferStatus::Succeeded => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            TransferStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.bytes_dropped.fetch_add(expected_size, Ordering::Relaxed);
            }
            TransferStatus::Skipped(SkipReason::AlreadyPresent) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                self.bytes_skipped.fetch_add(expected_size, Ordering::Relaxed);
            }
            TransferStatus::Skipped(_) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                self.bytes_dropped.fetch_add(expected_size, Ordering::Relaxed);
            }
            TransferStatus::Pending | TransferStatus::InFlight => {}
        }
    }

    /// Number of transfers currently owned by a worker.
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Take a snapshot. Also records a speed sample.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let now = Instant::now();
        let elapsed = now.duration_since(self.started);

        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let bytes_done = self.bytes_done.load(Ordering::Relaxed);
        let bytes_total_estimate = self.bytes_total_estimate.load(Ordering::Relaxed);
        let bytes_skipped = self.bytes_skipped.load(Ordering::Relaxed);
        let bytes_dropped = self.bytes_dropped.load(Ordering::Relaxed);

        let speed_bps = self.sample_speed(now, elapsed);
        let remaining = bytes_total_estimate
            .saturating_sub(bytes_done)
            .saturating_sub(bytes_skipped)
            .saturating_sub(bytes_dropped);
        let eta = estimate_eta(remaining, speed_bps);

        let mut active: Vec<ActiveTransferSnapshot> = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|p| ActiveTransferSnapshot {
                path: p.path.clone(),
                downloaded: p.downloaded(),
                total: p.total,
                attempt: p.attempt.load(Ordering::Relaxed),
            })
            .collect();
        active.sort_by(|a, b| a.path.cmp(&b.path));

        ProgressSnapshot {
            total_files: self.total_files.load(Ordering::Relaxed),
            completed_files: succeeded + skipped + failed,
            succeeded_files: succeeded,
            skipped_files: skipped,
            failed_files: failed,
            active_workers: active.len(),
            bytes_done,
            bytes_total_estimate,
            bytes_skipped,
            speed_bps,
            eta,
            elapsed,
            retries: self.retries.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
            discovery_complete: self.discovery_complete.load(Ordering::Relaxed),
            active,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn sample_speed(&self, now: Instant, elapsed: Duration) -> f64 {
        let transferred = self.bytes_transferred.load(Ordering::Relaxed);
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);

        samples.push_back((now, transferred));
        while samples.len() > 1 {
            match samples.front() {
                Some(&(t, _)) if now.duration_since(t) > self.speed_window => {
                    samples.pop_front();
                }
                _ => break,
            }
        }

        match samples.front() {
            Some(&(t, bytes)) if samples.len() > 1 && now > t => {
                transferred.saturating_sub(bytes) as f64 / now.duration_since(t).as_secs_f64()
            }
            _ if !elapsed.is_zero() => transferred as f64 / elapsed.as_secs_f64(),
            _ => 0.0,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn estimate_eta(remaining: u64, speed_bps: f64) -> Option<Duration> {
    if remaining == 0 {
        return Some(Duration::ZERO);
    }
    if !(speed_bps.is_finite() && speed_bps > 0.0) {
        return None;
    }
    Some(Duration::from_secs_f64(remaining as f64 / speed_bps))
}
