//! Transfer tasks and their status state machine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::entry::RemoteEntry;

/// Why a task was completed without a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A local file with the expected size already exists.
    AlreadyPresent,
    /// Dry-run mode: the transfer was planned but not executed.
    DryRun,
    /// The run-level byte quota did not admit this task.
    QuotaReached,
    /// The run was interrupted before this task was dispatched.
    Interrupted,
}

impl SkipReason {
    /// Short label for logs and summaries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyPresent => "already_present",
            Self::DryRun => "dry_run",
            Self::QuotaReached => "quota_reached",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Status of a transfer task.
///
/// `Pending → InFlight → {Succeeded, Failed}`, or `Pending → Skipped`.
/// Terminal states are absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Created, waiting for dispatch.
    Pending,
    /// Owned by a worker.
    InFlight,
    /// Downloaded and verified.
    Succeeded,
    /// Gave up (permanent failure, retries exhausted or interrupted mid-flight).
    Failed,
    /// Completed without a transfer.
    Skipped(SkipReason),
}

impl TransferStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped(_))
    }

    const fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight | Self::Skipped(_))
                | (Self::InFlight, Self::Succeeded | Self::Failed)
        )
    }
}

/// The unit of work: one remote file to one local path.
///
/// A task is owned by exactly one party at a time; ownership moves from the
/// scheduler to a worker on dispatch and back with the terminal report.
#[derive(Clone, Debug)]
pub struct TransferTask {
    /// The remote entry being mirrored.
    pub remote: RemoteEntry,
    /// Final local destination.
    pub local_path: PathBuf,
    /// Size announced by the listing.
    pub expected_size: u64,
    /// Number of fetch attempts started so far.
    pub attempts: u32,
    status: TransferStatus,
}

impl TransferTask {
    /// Create a pending task.
    pub fn new(remote: RemoteEntry, local_path: PathBuf) -> Self {
        let expected_size = remote.size;
        Self {
            remote,
            local_path,
            expected_size,
            attempts: 0,
            status: TransferStatus::Pending,
        }
    }

    /// Current status.
    pub const fn status(&self) -> TransferStatus {
        self.status
    }

    /// Remote path shortcut.
    pub fn remote_path(&self) -> &str {
        &self.remote.path
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// Returns `false` (and leaves the status unchanged) for illegal
    /// transitions, including any attempt to leave a terminal state.
    pub fn transition(&mut self, next: TransferStatus) -> bool {
        if self.status.allows(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                path = %self.remote.path,
                from = ?self.status,
                to = ?next,
                "Ignoring illegal transfer status transition"
            );
            false
        }
    }

    /// Mark a skip. Only valid while pending.
    pub fn skip(&mut self, reason: SkipReason) -> bool {
        self.transition(TransferStatus::Skipped(reason))
    }

    /// Start a new attempt, returning its 1-based number.
    pub const fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }
}
