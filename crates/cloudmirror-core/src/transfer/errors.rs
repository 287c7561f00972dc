//! Transfer and listing error types.
//!
//! These errors are serializable and never wrap `std::io::Error` directly;
//! I/O failures are captured as kind and message strings so the same values
//! can travel through events and summaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry classification of a per-file failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Expected to succeed on retry without outside intervention.
    Transient,
    /// Retrying cannot help (auth, not-found, remote quota).
    Permanent,
    /// Could not be classified; retried like a transient failure.
    Unknown,
}

impl FailureKind {
    /// Whether the retry policy may try again after this kind of failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent)
    }

    /// Short label for logs and summaries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an HTTP-like status code to a failure kind.
#[must_use]
pub const fn classify_status(status: u16) -> FailureKind {
    match status {
        401 | 403 | 404 | 409 | 410 | 507 => FailureKind::Permanent,
        408 | 429 | 500..=599 => FailureKind::Transient,
        _ => FailureKind::Unknown,
    }
}

/// Per-file failure raised at the collaborator boundary or by the worker.
///
/// These never abort a run; they terminate only the task they belong to.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransferError {
    /// Network or HTTP failure.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// Explicit rate-limit signal from the remote.
    #[error("Rate limited by remote")]
    RateLimited {
        /// Server-provided wait hint.
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<Duration>,
    },

    /// The remote file no longer exists.
    #[error("Not found: {path}")]
    NotFound {
        /// Remote path.
        path: String,
    },

    /// Access to the remote file was refused.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Detailed error message.
        message: String,
    },

    /// Credentials were rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Detailed error message.
        message: String,
    },

    /// The remote refused service because an account quota was exceeded.
    #[error("Remote quota exceeded: {message}")]
    RemoteQuotaExceeded {
        /// Detailed error message.
        message: String,
    },

    /// The stream ended with a different byte count than the listing announced.
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Size from the listing.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// Local I/O failure while writing the destination.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (`std::io::ErrorKind` debug name).
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// The remote path cannot be mapped to a safe local path.
    #[error("Invalid path: {path}")]
    InvalidPath {
        /// Offending remote path.
        path: String,
    },

    /// The run was interrupted while this transfer was in flight.
    #[error("Transfer interrupted")]
    Interrupted,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl TransferError {
    /// Create a network error without a status code.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a network error with an HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a rate-limit error with an optional retry-after hint.
    #[must_use]
    pub const fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a permission-denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a remote-quota error.
    pub fn remote_quota_exceeded(message: impl Into<String>) -> Self {
        Self::RemoteQuotaExceeded {
            message: message.into(),
        }
    }

    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Classify this error for the retry policy.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network {
                status_code: Some(code),
                ..
            } => classify_status(*code),
            Self::Network { .. } | Self::RateLimited { .. } | Self::SizeMismatch { .. } => {
                FailureKind::Transient
            }
            Self::NotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::Unauthorized { .. }
            | Self::RemoteQuotaExceeded { .. }
            | Self::InvalidPath { .. }
            | Self::Interrupted => FailureKind::Permanent,
            Self::Io { kind, .. } => match kind.as_str() {
                "PermissionDenied" | "ReadOnlyFilesystem" | "InvalidFilename" => {
                    FailureKind::Permanent
                }
                _ => FailureKind::Unknown,
            },
            Self::Other { .. } => FailureKind::Unknown,
        }
    }

    /// Whether this is an explicit rate-limit signal (HTTP 429 counts too).
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Network {
                    status_code: Some(429),
                    ..
                }
        )
    }

    /// Server-provided wait hint, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Check if this is an interruption.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network {
                message,
                status_code: Some(code),
            } => format!("Network error (HTTP {code}): {message}"),
            Self::Network { message, .. } => format!("Network error: {message}"),
            Self::RateLimited {
                retry_after: Some(wait),
            } => format!("Rate limited by the remote; asked to wait {}s.", wait.as_secs()),
            Self::RateLimited { retry_after: None } => "Rate limited by the remote.".to_string(),
            Self::NotFound { path } => format!("'{path}' no longer exists on the remote."),
            Self::PermissionDenied { message } => format!("Access denied: {message}"),
            Self::Unauthorized { message } => {
                format!("Credentials were rejected: {message}")
            }
            Self::RemoteQuotaExceeded { message } => {
                format!("Remote quota exceeded: {message}")
            }
            Self::SizeMismatch { expected, actual } => {
                format!("Received {actual} bytes but the listing announced {expected}.")
            }
            Self::Io { message, .. } => format!("File operation failed: {message}"),
            Self::InvalidPath { path } => format!("Cannot map '{path}' to a local path."),
            Self::Interrupted => "Transfer was interrupted.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io_error(&err)
    }
}

/// Failure of the directory listing stream. Always fatal to the run.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ListingError {
    /// The listing request could not be completed.
    #[error("Listing transport error: {message}")]
    Transport {
        /// Detailed error message.
        message: String,
    },

    /// The directory being listed does not exist.
    #[error("Directory not found: {path}")]
    NotFound {
        /// Remote directory path.
        path: String,
    },

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl ListingError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        for code in [408, 429, 500, 502, 503, 504] {
            assert_eq!(classify_status(code), FailureKind::Transient, "{code}");
        }
        for code in [401, 403, 404, 409, 410, 507] {
            assert_eq!(classify_status(code), FailureKind::Permanent, "{code}");
        }
        assert_eq!(classify_status(418), FailureKind::Unknown);
        assert_eq!(classify_status(302), FailureKind::Unknown);
    }

    #[test]
    fn test_kind_is_single_classifier() {
        assert_eq!(TransferError::network("reset").kind(), FailureKind::Transient);
        assert_eq!(
            TransferError::network_with_status("gone", 410).kind(),
            FailureKind::Permanent
        );
        assert_eq!(
            TransferError::rate_limited(None).kind(),
            FailureKind::Transient
        );
        assert_eq!(TransferError::not_found("/a").kind(), FailureKind::Permanent);
        assert_eq!(
            TransferError::unauthorized("token").kind(),
            FailureKind::Permanent
        );
        assert_eq!(
            TransferError::SizeMismatch {
                expected: 10,
                actual: 5
            }
            .kind(),
            FailureKind::Transient
        );
        assert_eq!(TransferError::other("?").kind(), FailureKind::Unknown);
        assert_eq!(TransferError::Interrupted.kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access");
        let err = TransferError::from_io_error(&io_err);

        match &err {
            TransferError::Io { kind, message } => {
                assert_eq!(kind, "PermissionDenied");
                assert!(message.contains("no access"));
            }
            _ => panic!("Expected Io variant"),
        }
        assert_eq!(err.kind(), FailureKind::Permanent);

        let other = TransferError::from(std::io::Error::other("disk hiccup"));
        assert_eq!(other.kind(), FailureKind::Unknown);
    }

    #[test]
    fn test_rate_limit_detection() {
        let hinted = TransferError::rate_limited(Some(Duration::from_secs(7)));
        assert!(hinted.is_rate_limited());
        assert_eq!(hinted.retry_after(), Some(Duration::from_secs(7)));
        assert!(TransferError::network_with_status("slow down", 429).is_rate_limited());
        assert!(!TransferError::network("reset").is_rate_limited());
    }

    #[test]
    fn test_error_serialization() {
        let err = TransferError::network_with_status("timeout", 503);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("503"));

        let parsed: TransferError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_user_messages() {
        let err = TransferError::SizeMismatch {
            expected: 100,
            actual: 40,
        };
        assert!(err.user_message().contains("100"));
        assert!(err.user_message().contains("40"));
        assert!(FailureKind::Unknown.is_retryable());
        assert!(!FailureKind::Permanent.is_retryable());
    }
}
