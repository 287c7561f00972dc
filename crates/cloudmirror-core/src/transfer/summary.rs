//! End-of-run accounting.
//!
//! A run always finishes with a `RunSummary`, including runs that were cut
//! short by the byte quota, an interruption or a fatal listing failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::FailureKind;

/// How a run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every listed entry was processed.
    #[default]
    Completed,
    /// The per-run byte quota stopped admission early.
    QuotaReached,
    /// The run was interrupted (or aborted) before the listing was exhausted.
    Interrupted,
}

impl RunOutcome {
    /// Short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::QuotaReached => "quota_reached",
            Self::Interrupted => "interrupted",
        }
    }
}

/// A task that ended in `Failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransfer {
    /// Remote path of the file.
    pub remote_path: String,
    /// Classification of the last error.
    pub kind: FailureKind,
    /// User-facing description of the last error.
    pub error: String,
    /// Number of attempts made.
    pub attempts: u32,
}

/// Summary of one mirror run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run produced this summary.
    pub finished_at: DateTime<Utc>,
    /// How the run ended.
    pub outcome: RunOutcome,

    /// Tasks that downloaded and verified their file.
    pub succeeded: u64,
    /// Tasks skipped because the local copy already matched.
    pub skipped_existing: u64,
    /// Tasks skipped for any other reason (dry run, quota, interruption).
    pub skipped_other: u64,
    /// Tasks that ended `Failed`.
    pub failed: u64,

    /// Files rejected by the per-file filter (no task created).
    pub filtered_files: u64,
    /// Directories pruned by the folder filter (never listed).
    pub pruned_directories: u64,

    /// Bytes committed by successful transfers.
    pub bytes_downloaded: u64,
    /// Bytes of files skipped because they were already present.
    pub bytes_skipped: u64,

    /// Failed tasks, in completion order.
    pub failures: Vec<FailedTransfer>,
}

impl RunSummary {
    /// Total number of tasks that reached a terminal state.
    #[must_use]
    pub const fn total_tasks(&self) -> u64 {
        self.succeeded + self.skipped_existing + self.skipped_other + self.failed
    }

    /// Total skipped tasks regardless of reason.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped_existing + self.skipped_other
    }

    /// Whether any task failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
