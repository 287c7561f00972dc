//! Run accounting.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cloudmirror_core::{
    FailedTransfer, FailureKind, RunOutcome, RunSummary, SkipReason, TransferError,
    TransferStatus,
};

use crate::traversal::WalkStats;

/// Accumulates terminal task reports for one run.
///
/// `finish` consumes the ledger, so a run produces its summary exactly once.
#[derive(Debug)]
pub struct RunLedger {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    succeeded: u64,
    skipped_existing: u64,
    skipped_other: u64,
    failed: u64,
    filtered_files: u64,
    bytes_downloaded: u64,
    bytes_skipped: u64,
    failures: Vec<FailedTransfer>,
}

impl Default for RunLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLedger {
    /// Start a ledger with a fresh run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            succeeded: 0,
            skipped_existing: 0,
            skipped_other: 0,
            failed: 0,
            filtered_files: 0,
            bytes_downloaded: 0,
            bytes_skipped: 0,
            failures: Vec::new(),
        }
    }

    /// Id of the run being recorded.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// A file was rejected by the per-file filter.
    pub const fn record_filtered(&mut self) {
        self.filtered_files += 1;
    }

    /// A task was skipped before dispatch.
    pub const fn record_skipped(&mut self, reason: SkipReason, size: u64) {
        match reason {
            SkipReason::AlreadyPresent => {
                self.skipped_existing += 1;
                self.bytes_skipped += size;
            }
            SkipReason::DryRun | SkipReason::QuotaReached | SkipReason::Interrupted => {
                self.skipped_other += 1;
            }
        }
    }

    /// A dispatched task finished `Succeeded`.
    pub const fn record_success(&mut self, bytes: u64) {
        self.succeeded += 1;
        self.bytes_downloaded += bytes;
    }

    /// A dispatched task finished `Failed`.
    pub fn record_failure(&mut self, remote_path: &str, error: &TransferError, attempts: u32) {
        self.push_failure(remote_path, error.kind(), error.user_message(), attempts);
    }

    /// A worker died without reporting; only its path is known.
    pub fn record_lost(&mut self, remote_path: &str, message: impl Into<String>) {
        self.push_failure(remote_path, FailureKind::Unknown, message.into(), 0);
    }

    /// Record a terminal status reported by a worker.
    pub fn record_terminal(
        &mut self,
        status: TransferStatus,
        remote_path: &str,
        bytes: u64,
        error: Option<&TransferError>,
        attempts: u32,
    ) {
        match (status, error) {
            (TransferStatus::Succeeded, _) => self.record_success(bytes),
            (TransferStatus::Failed, Some(err)) => self.record_failure(remote_path, err, attempts),
            (TransferStatus::Failed, None) => {
                self.push_failure(remote_path, FailureKind::Unknown, String::new(), attempts);
            }
            (TransferStatus::Skipped(reason), _) => self.record_skipped(reason, 0),
            (TransferStatus::Pending | TransferStatus::InFlight, _) => {
                tracing::warn!(
                    target: "cloudmirror.engine",
                    path = remote_path,
                    status = ?status,
                    "Non-terminal status reported to the ledger"
                );
            }
        }
    }

    fn push_failure(&mut self, remote_path: &str, kind: FailureKind, error: String, attempts: u32) {
        self.failed += 1;
        self.failures.push(FailedTransfer {
            remote_path: remote_path.to_string(),
            kind,
            error,
            attempts,
        });
    }

    /// Produce the summary.
    pub fn finish(self, outcome: RunOutcome, walk: WalkStats) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            outcome,
            succeeded: self.succeeded,
            skipped_existing: self.skipped_existing,
            skipped_other: self.skipped_other,
            failed: self.failed,
            filtered_files: self.filtered_files,
            pruned_directories: walk.pruned_directories,
            bytes_downloaded: self.bytes_downloaded,
            bytes_skipped: self.bytes_skipped,
            failures: self.failures,
        }
    }
}
