//! Transfer event emitter port.
//!
//! Lets the engine report what it is doing without knowing who listens
//! (a terminal renderer, a channel consumer, the log).

use tokio::sync::mpsc;

use crate::transfer::TransferEvent;

/// Port for emitting transfer events.
///
/// `emit` is called from worker tasks and must not block.
pub trait TransferEventEmitterPort: Send + Sync {
    /// Emit a transfer event.
    fn emit(&self, event: TransferEvent);
}

/// A no-op emitter for tests and contexts that only poll progress.
#[derive(Debug, Clone, Default)]
pub struct NoopTransferEmitter;

impl NoopTransferEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransferEventEmitterPort for NoopTransferEmitter {
    fn emit(&self, _event: TransferEvent) {}
}

/// Forwards events into an unbounded tokio channel.
///
/// Sending never blocks; events are dropped silently once the receiver is
/// gone.
#[derive(Debug, Clone)]
pub struct ChannelTransferEmitter {
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl ChannelTransferEmitter {
    /// Create an emitter and the receiving half.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransferEventEmitterPort for ChannelTransferEmitter {
    fn emit(&self, event: TransferEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes events to `tracing`.
///
/// Progress ticks go to `trace`, lifecycle events to `debug`/`info`, and
/// failures to `warn`.
#[derive(Debug, Clone, Default)]
pub struct LoggingTransferEmitter;

impl LoggingTransferEmitter {
    /// Create a new logging emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransferEventEmitterPort for LoggingTransferEmitter {
    fn emit(&self, event: TransferEvent) {
        match &event {
            TransferEvent::TransferStarted {
                path,
                size,
                attempt,
            } => tracing::debug!(path = %path, size, attempt, "Transfer started"),
            TransferEvent::TransferProgress {
                path,
                downloaded,
                total,
            } => tracing::trace!(path = %path, downloaded, total, "Transfer progress"),
            TransferEvent::TransferRetrying {
                path,
                attempt,
                delay_ms,
                kind,
                error,
            } => tracing::info!(
                path = %path,
                attempt,
                delay_ms,
                kind = %kind,
                error = %error,
                "Retrying transfer"
            ),
            TransferEvent::TransferCompleted {
                path,
                bytes,
                attempts,
            } => tracing::info!(path = %path, bytes, attempts, "Transfer completed"),
            TransferEvent::TransferSkipped { path, reason } => {
                tracing::debug!(path = %path, reason = reason.as_str(), "Transfer skipped");
            }
            TransferEvent::TransferFailed {
                path,
                kind,
                error,
                attempts,
            } => tracing::warn!(
                path = %path,
                kind = %kind,
                attempts,
                error = %error,
                "Transfer failed"
            ),
            TransferEvent::QuotaReached {
                bytes_downloaded,
                max_bytes,
            } => tracing::info!(bytes_downloaded, max_bytes, "Per-run byte quota reached"),
            TransferEvent::RunCompleted { summary } => tracing::info!(
                run_id = %summary.run_id,
                outcome = summary.outcome.as_str(),
                succeeded = summary.succeeded,
                skipped = summary.skipped(),
                failed = summary.failed,
                bytes = summary.bytes_downloaded,
                "Run completed"
            ),
        }
    }
}
