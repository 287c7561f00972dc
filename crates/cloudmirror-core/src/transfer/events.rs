//! Transfer events - discriminated union for everything a run reports.

use serde::{Deserialize, Serialize};

use super::errors::FailureKind;
use super::summary::RunSummary;
use crate::domain::SkipReason;

/// Single discriminated union for all transfer events.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"transfer_retrying","path":"/a.bin","attempt":2,"delay_ms":2000,...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferEvent {
    /// A worker started an attempt.
    TransferStarted {
        /// Remote path.
        path: String,
        /// Expected size in bytes.
        size: u64,
        /// 1-based attempt number.
        attempt: u32,
    },

    /// Throttled byte progress for one transfer.
    TransferProgress {
        /// Remote path.
        path: String,
        /// Bytes written in the current attempt.
        downloaded: u64,
        /// Expected size in bytes.
        total: u64,
    },

    /// An attempt failed and will be retried after `delay_ms`.
    TransferRetrying {
        /// Remote path.
        path: String,
        /// The attempt that just failed.
        attempt: u32,
        /// Wait before the next attempt.
        delay_ms: u64,
        /// Classification of the failure.
        kind: FailureKind,
        /// Error description.
        error: String,
    },

    /// A transfer finished and was verified.
    TransferCompleted {
        /// Remote path.
        path: String,
        /// Bytes written.
        bytes: u64,
        /// Attempts it took.
        attempts: u32,
    },

    /// A task ended without a transfer.
    TransferSkipped {
        /// Remote path.
        path: String,
        /// Why it was skipped.
        reason: SkipReason,
    },

    /// A task gave up.
    TransferFailed {
        /// Remote path.
        path: String,
        /// Classification of the last failure.
        kind: FailureKind,
        /// Error description.
        error: String,
        /// Attempts made.
        attempts: u32,
    },

    /// The per-run byte quota stopped admission.
    QuotaReached {
        /// Bytes committed so far.
        bytes_downloaded: u64,
        /// Configured limit.
        max_bytes: u64,
    },

    /// The run finished; carries the final accounting.
    RunCompleted {
        /// Final summary.
        summary: RunSummary,
    },
}

impl TransferEvent {
    /// Create a started event.
    pub fn started(path: impl Into<String>, size: u64, attempt: u32) -> Self {
        Self::TransferStarted {
            path: path.into(),
            size,
            attempt,
        }
    }

    /// Create a progress event.
    pub fn progress(path: impl Into<String>, downloaded: u64, total: u64) -> Self {
        Self::TransferProgress {
            path: path.into(),
            downloaded,
            total,
        }
    }

    /// Create a retrying event.
    pub fn retrying(
        path: impl Into<String>,
        attempt: u32,
        delay_ms: u64,
        kind: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self::TransferRetrying {
            path: path.into(),
            attempt,
            delay_ms,
            kind,
            error: error.into(),
        }
    }

    /// Create a completed event.
    pub fn completed(path: impl Into<String>, bytes: u64, attempts: u32) -> Self {
        Self::TransferCompleted {
            path: path.into(),
            bytes,
            attempts,
        }
    }

    /// Create a skipped event.
    pub fn skipped(path: impl Into<String>, reason: SkipReason) -> Self {
        Self::TransferSkipped {
            path: path.into(),
            reason,
        }
    }

    /// Create a failed event.
    pub fn failed(
        path: impl Into<String>,
        kind: FailureKind,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::TransferFailed {
            path: path.into(),
            kind,
            error: error.into(),
            attempts,
        }
    }

    /// Create a quota-reached event.
    #[must_use]
    pub const fn quota_reached(bytes_downloaded: u64, max_bytes: u64) -> Self {
        Self::QuotaReached {
            bytes_downloaded,
            max_bytes,
        }
    }

    /// Create a run-completed event.
    #[must_use]
    pub const fn run_completed(summary: RunSummary) -> Self {
        Self::RunCompleted { summary }
    }

    /// Remote path this event refers to, if it is a per-file event.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::TransferStarted { path, .. }
            | Self::TransferProgress { path, .. }
            | Self::TransferRetrying { path, .. }
            | Self::TransferCompleted { path, .. }
            | Self::TransferSkipped { path, .. }
            | Self::TransferFailed { path, .. } => Some(path),
            Self::QuotaReached { .. } | Self::RunCompleted { .. } => None,
        }
    }

    /// Event name, matching the serialized `type` tag.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::TransferStarted { .. } => "transfer_started",
            Self::TransferProgress { .. } => "transfer_progress",
            Self::TransferRetrying { .. } => "transfer_retrying",
            Self::TransferCompleted { .. } => "transfer_completed",
            Self::TransferSkipped { .. } => "transfer_skipped",
            Self::TransferFailed { .. } => "transfer_failed",
            Self::QuotaReached { .. } => "quota_reached",
            Self::RunCompleted { .. } => "run_completed",
        }
    }
}
