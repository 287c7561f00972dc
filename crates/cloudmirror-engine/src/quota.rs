//! Per-run byte quota.
//!
//! Admission compares committed bytes plus the candidate's size against the
//! limit. Bytes held by in-flight transfers do not count, so files that are
//! still downloading may carry the final total past `max_bytes`. A failed
//! transfer never consumes budget.
//!
//! Reservations are still tracked so callers can see how much is in flight.

use std::sync::atomic::{AtomicU64, Ordering};

/// Byte budget shared by the scheduler and the workers of one run.
#[derive(Debug)]
pub struct RunQuota {
    max_bytes: u64,
    downloaded: AtomicU64,
    reserved: AtomicU64,
}

impl RunQuota {
    /// Create a quota; `0` means unlimited.
    pub const fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            downloaded: AtomicU64::new(0),
            reserved: AtomicU64::new(0),
        }
    }

    /// Whether a limit is configured.
    pub const fn is_limited(&self) -> bool {
        self.max_bytes > 0
    }

    /// The configured limit (`0` = unlimited).
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Whether a file of `size` bytes may still start.
    pub fn admits(&self, size: u64) -> bool {
        !self.is_limited()
            || self
                .downloaded()
                .checked_add(size)
                .is_some_and(|total| total <= self.max_bytes)
    }

    /// Admit and reserve `size` bytes for a transfer about to be dispatched.
    pub fn try_reserve(&self, size: u64) -> bool {
        if !self.admits(size) {
            return false;
        }
        self.reserved.fetch_add(size, Ordering::AcqRel);
        true
    }

    /// Convert a reservation into downloaded bytes.
    ///
    /// `actual` is what was written; it only differs from `reserved` if the
    /// remote changed size, in which case the committed total follows reality.
    pub fn commit(&self, reserved: u64, actual: u64) {
        // Add before releasing so admission never sees the bytes in neither counter.
        self.downloaded.fetch_add(actual, Ordering::AcqRel);
        self.release(reserved);
    }

    /// Drop a reservation without committing anything.
    pub fn release(&self, reserved: u64) {
        let _ = self
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(reserved))
            });
    }

    /// Bytes committed by successful transfers.
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Acquire)
    }

    /// Bytes reserved by in-flight transfers.
    pub fn reserved(&self) -> u64 {
        self.reserved.load(Ordering::Acquire)
    }
}
