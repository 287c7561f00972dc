//! Transfer worker pipeline.
//!
//! A worker owns one `TransferTask` from dispatch to its terminal status. It
//! operates on the task value and cloned `Arc` dependencies, with no access
//! to the scheduler's state.
//!
//! # Attempt pipeline
//!
//! 1. Wait for a rate-limiter slot (cancellable)
//! 2. Open the remote byte stream
//! 3. Stream into `<dest>.part`, with an idle timeout per chunk
//! 4. Verify the byte count, then rename onto the destination
//!
//! Failures are classified, reported to the limiter and handed to the retry
//! policy. Backoff sleeps hold no lock and end early on interruption.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use cloudmirror_core::{
    ContentFetcher, TransferError, TransferEvent, TransferEventEmitterPort, TransferStatus,
    TransferTask,
};

use super::paths::PartFile;
use crate::progress::{ProgressAggregator, ProgressThrottle, TransferProgress};
use crate::quota::RunQuota;
use crate::rate::{AdaptiveRateLimiter, RequestOutcome};
use crate::retry::{RetryDecision, RetryPolicy};

/// Dependencies shared by every worker of a run.
#[derive(Clone)]
pub struct WorkerDeps {
    /// Remote content access.
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Shared request pacing.
    pub limiter: Arc<AdaptiveRateLimiter>,
    /// Retry decisions.
    pub policy: RetryPolicy,
    /// Run byte budget.
    pub quota: Arc<RunQuota>,
    /// Live progress.
    pub progress: Arc<ProgressAggregator>,
    /// Event sink.
    pub events: Arc<dyn TransferEventEmitterPort>,
    /// Longest silence tolerated between two chunks.
    pub idle_timeout: Duration,
    /// Minimum spacing of per-file progress events.
    pub progress_interval: Duration,
}

/// A dispatched task.
pub struct TransferJob {
    /// Scheduler-assigned id.
    pub id: u64,
    /// The task, in `Pending`.
    pub task: TransferTask,
    /// Bytes reserved against the run quota at admission.
    pub reserved: u64,
    /// Run interruption.
    pub cancel: CancellationToken,
}

/// What a worker hands back to the scheduler.
#[derive(Debug)]
pub struct WorkerReport {
    /// Scheduler-assigned id.
    pub id: u64,
    /// The task in its terminal status.
    pub task: TransferTask,
    /// Bytes committed (0 unless succeeded).
    pub bytes: u64,
    /// Last error, for failed tasks.
    pub error: Option<TransferError>,
}

/// Run a job until the task is `Succeeded` or `Failed`.
pub async fn run_job(job: TransferJob, deps: &WorkerDeps) -> WorkerReport {
    let TransferJob {
        id,
        mut task,
        reserved,
        cancel,
    } = job;

    task.transition(TransferStatus::InFlight);
    let progress = deps
        .progress
        .transfer_started(id, task.remote_path(), task.expected_size);

    let outcome = attempt_loop(&mut task, &progress, &cancel, deps).await;

    let (bytes, error) = match outcome {
        Ok(bytes) => {
            task.transition(TransferStatus::Succeeded);
            deps.quota.commit(reserved, bytes);
            deps.events
                .emit(TransferEvent::completed(task.remote_path(), bytes, task.attempts));
            tracing::debug!(
                target: "cloudmirror.engine",
                path = %task.remote_path(),
                bytes,
                attempt = task.attempts,
                "Transfer completed"
            );
            (bytes, None)
        }
        Err(err) => {
            task.transition(TransferStatus::Failed);
            deps.quota.release(reserved);
            let kind = err.kind();
            deps.events.emit(TransferEvent::failed(
                task.remote_path(),
                kind,
                err.user_message(),
                task.attempts,
            ));
            tracing::warn!(
                target: "cloudmirror.engine",
                path = %task.remote_path(),
                kind = %kind,
                attempt = task.attempts,
                error = %err,
                "Transfer failed"
            );
            (0, Some(err))
        }
    };

    deps.progress
        .transfer_finished(id, task.status(), task.expected_size);

    WorkerReport {
        id,
        task,
        bytes,
        error,
    }
}

async fn attempt_loop(
    task: &mut TransferTask,
    progress: &TransferProgress,
    cancel: &CancellationToken,
    deps: &WorkerDeps,
) -> Result<u64, TransferError> {
    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Interrupted);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransferError::Interrupted),
            () = deps.limiter.acquire() => {}
        }

        let attempt = task.begin_attempt();
        deps.progress.attempt_started(progress, attempt);
        deps.events.emit(TransferEvent::started(
            task.remote_path(),
            task.expected_size,
            attempt,
        ));

        let err = match attempt_once(task, progress, cancel, deps).await {
            Ok(bytes) => {
                deps.limiter.report(RequestOutcome::Success).await;
                return Ok(bytes);
            }
            Err(err) if err.is_interrupted() => return Err(err),
            Err(err) => err,
        };

        let kind = err.kind();
        if err.is_rate_limited() {
            deps.progress.record_rate_limit();
            deps.limiter.report(RequestOutcome::RateLimited).await;
        } else {
            deps.limiter.report(RequestOutcome::Failed).await;
        }

        match deps.policy.decide(attempt, kind, err.retry_after()) {
            RetryDecision::GiveUp => return Err(err),
            RetryDecision::Retry { delay } => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                tracing::info!(
                    target: "cloudmirror.engine",
                    path = %task.remote_path(),
                    attempt,
                    delay_ms,
                    kind = %kind,
                    error = %err,
                    "Retrying transfer"
                );
                deps.events.emit(TransferEvent::retrying(
                    task.remote_path(),
                    attempt,
                    delay_ms,
                    kind,
                    err.user_message(),
                ));
                deps.progress.record_retry();

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(TransferError::Interrupted),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// One fetch-and-write attempt. Returns the committed byte count.
async fn attempt_once(
    task: &TransferTask,
    progress: &TransferProgress,
    cancel: &CancellationToken,
    deps: &WorkerDeps,
) -> Result<u64, TransferError> {
    let mut stream = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(TransferError::Interrupted),
        result = deps.fetcher.fetch(&task.remote) => result?,
    };

    let mut part = PartFile::create(&task.local_path).await?;
    let mut throttle = ProgressThrottle::new(deps.progress_interval);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransferError::Interrupted),
            next = tokio::time::timeout(deps.idle_timeout, stream.next()) => next,
        };

        let chunk = match next {
            Err(_) => {
                return Err(TransferError::network(format!(
                    "no data received for {}s",
                    deps.idle_timeout.as_secs()
                )));
            }
            Ok(None) => break,
            Ok(Some(chunk)) => chunk?,
        };

        part.write_chunk(&chunk).await?;
        deps.progress.add_bytes(progress, chunk.len() as u64);

        if throttle.should_emit(part.written(), task.expected_size) {
            deps.events.emit(TransferEvent::progress(
                task.remote_path(),
                part.written(),
                task.expected_size,
            ));
        }
    }

    let written = part.written();
    if written != task.expected_size {
        return Err(TransferError::SizeMismatch {
            expected: task.expected_size,
            actual: written,
        });
    }

    part.commit(&task.local_path).await
}
