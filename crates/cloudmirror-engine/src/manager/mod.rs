//! Mirror run orchestration.
//!
//! `MirrorEngine::run` drives one mirror pass:
//!
//! - **Walker**: lists the remote tree lazily, pruning excluded folders
//! - **Scheduler** (this module): filters, plans local paths, applies the
//!   resume and dry-run rules, then admits tasks through the worker
//!   semaphore and the run quota
//! - **Workers**: one spawned task per admitted file, see [`worker`]
//! - **Ledger**: turns terminal reports into the `RunSummary`
//!
//! # Concurrency Model
//!
//! - A `Semaphore` with `workers` permits bounds in-flight transfers; the
//!   permit moves into the spawned task and is released when it ends
//! - Finished workers are reaped from the `JoinSet` between dispatches and
//!   drained before the summary is built
//! - The scheduler never holds a lock while awaiting

pub mod ledger;
pub mod paths;
pub mod worker;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use cloudmirror_core::{
    ContentFetcher, FailureKind, FileFilter, FolderFilter, ListingError, ListingSource,
    MirrorConfig, MirrorError, RemoteEntry, RunOutcome, RunSummary, SkipReason, TransferEvent,
    TransferEventEmitterPort, TransferStatus, TransferTask,
};

use crate::progress::ProgressAggregator;
use crate::quota::RunQuota;
use crate::rate::AdaptiveRateLimiter;
use crate::retry::RetryPolicy;
use crate::traversal::TreeWalker;

pub use ledger::RunLedger;
pub use worker::{TransferJob, WorkerDeps, WorkerReport};

/// Collaborators and settings for a [`MirrorEngine`].
pub struct MirrorEngineDeps {
    /// Remote directory listing.
    pub listing: Arc<dyn ListingSource>,
    /// Remote file content.
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Event sink.
    pub event_emitter: Arc<dyn TransferEventEmitterPort>,
    /// Run configuration.
    pub config: MirrorConfig,
}

/// Bookkeeping for a spawned worker, kept until its report is reaped.
struct Dispatched {
    remote_path: String,
    expected_size: u64,
    reserved: u64,
}

type JoinOutcome = (u64, std::thread::Result<WorkerReport>);

/// Mutable state of one run.
struct RunState {
    ledger: RunLedger,
    in_flight: JoinSet<JoinOutcome>,
    dispatched: HashMap<u64, Dispatched>,
    next_id: u64,
}

/// Mirrors a remote tree to local disk.
pub struct MirrorEngine {
    listing: Arc<dyn ListingSource>,
    fetcher: Arc<dyn ContentFetcher>,
    events: Arc<dyn TransferEventEmitterPort>,
    config: MirrorConfig,
    progress: Arc<ProgressAggregator>,
}

impl MirrorEngine {
    /// Create an engine.
    pub fn new(deps: MirrorEngineDeps) -> Self {
        Self {
            listing: deps.listing,
            fetcher: deps.fetcher,
            events: deps.event_emitter,
            config: deps.config,
            progress: Arc::new(ProgressAggregator::new()),
        }
    }

    /// Live progress, for pull-based subscribers.
    pub fn progress(&self) -> Arc<ProgressAggregator> {
        Arc::clone(&self.progress)
    }

    /// The configuration this engine runs with.
    pub const fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Run one mirror pass.
    ///
    /// Per-file failures are recorded in the summary. A listing failure
    /// stops admission, drains in-flight transfers and returns
    /// [`MirrorError::Aborted`] with the partial accounting.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, MirrorError> {
        self.config.validate()?;
        tokio::fs::create_dir_all(&self.config.dest_root)
            .await
            .map_err(|e| MirrorError::destination(&self.config.dest_root, &e))?;

        let quota = Arc::new(RunQuota::new(self.config.max_bytes_per_run));
        let deps = WorkerDeps {
            fetcher: Arc::clone(&self.fetcher),
            limiter: Arc::new(AdaptiveRateLimiter::new(self.config.rate_limiter.clone())),
            policy: RetryPolicy::new(self.config.retry.clone()),
            quota: Arc::clone(&quota),
            progress: Arc::clone(&self.progress),
            events: Arc::clone(&self.events),
            idle_timeout: self.config.idle_timeout,
            progress_interval: self.config.progress_interval,
        };

        let mut walker = TreeWalker::new(
            Arc::clone(&self.listing),
            FolderFilter::from_config(&self.config.filter),
            self.config.remote_root.clone(),
        );
        let file_filter = FileFilter::from_config(&self.config.filter);
        let semaphore = Arc::new(Semaphore::new(self.config.workers));

        let mut state = RunState {
            ledger: RunLedger::new(),
            in_flight: JoinSet::new(),
            dispatched: HashMap::new(),
            next_id: 0,
        };

        tracing::info!(
            target: "cloudmirror.engine",
            run_id = %state.ledger.run_id(),
            root = %self.config.remote_root,
            dest = %self.config.dest_root.display(),
            workers = self.config.workers,
            max_bytes = self.config.max_bytes_per_run,
            dry_run = self.config.dry_run,
            "Starting mirror run"
        );

        let mut outcome = RunOutcome::Completed;
        let mut abort: Option<ListingError> = None;

        loop {
            while let Some(joined) = state.in_flight.try_join_next() {
                self.reap(&mut state, joined, &quota);
            }

            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    outcome = RunOutcome::Interrupted;
                    break;
                }
                next = walker.next_file() => next,
            };

            let entry = match next {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(
                        target: "cloudmirror.engine",
                        error = %err,
                        "Listing failed, aborting run"
                    );
                    outcome = RunOutcome::Interrupted;
                    abort = Some(err);
                    break;
                }
            };

            if let Err(rejection) = file_filter.check(&entry) {
                tracing::trace!(
                    target: "cloudmirror.engine",
                    path = %entry.path,
                    rejection = ?rejection,
                    "File filtered"
                );
                state.ledger.record_filtered();
                continue;
            }

            let Some(mut task) = self.plan(&mut state, entry) else {
                continue;
            };

            if paths::existing_size(&task.local_path).await == Some(task.expected_size) {
                self.skip(&mut state, &mut task, SkipReason::AlreadyPresent);
                continue;
            }

            if self.config.dry_run {
                self.skip(&mut state, &mut task, SkipReason::DryRun);
                continue;
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                self.skip(&mut state, &mut task, SkipReason::Interrupted);
                outcome = RunOutcome::Interrupted;
                break;
            };

            if !quota.try_reserve(task.expected_size) {
                tracing::info!(
                    target: "cloudmirror.engine",
                    path = %task.remote_path(),
                    bytes = quota.downloaded(),
                    max_bytes = quota.max_bytes(),
                    "Run quota reached, stopping admission"
                );
                self.skip(&mut state, &mut task, SkipReason::QuotaReached);
                self.events.emit(TransferEvent::quota_reached(
                    quota.downloaded(),
                    quota.max_bytes(),
                ));
                outcome = RunOutcome::QuotaReached;
                break;
            }

            let id = state.next_id;
            state.next_id += 1;
            state.dispatched.insert(
                id,
                Dispatched {
                    remote_path: task.remote_path().to_string(),
                    expected_size: task.expected_size,
                    reserved: task.expected_size,
                },
            );

            let job = TransferJob {
                id,
                reserved: task.expected_size,
                task,
                cancel: cancel.clone(),
            };
            let deps = deps.clone();
            state.in_flight.spawn(async move {
                let _permit = permit;
                let report = AssertUnwindSafe(worker::run_job(job, &deps))
                    .catch_unwind()
                    .await;
                (id, report)
            });
        }

        self.progress.discovery_finished();

        while let Some(joined) = state.in_flight.join_next().await {
            self.reap(&mut state, joined, &quota);
        }
        for (id, lost) in std::mem::take(&mut state.dispatched) {
            self.record_lost(&mut state, id, &lost, "worker ended without a report", &quota);
        }

        let summary = state.ledger.finish(outcome, walker.stats());
        tracing::info!(
            target: "cloudmirror.engine",
            run_id = %summary.run_id,
            outcome = summary.outcome.as_str(),
            succeeded = summary.succeeded,
            skipped = summary.skipped(),
            failed = summary.failed,
            bytes = summary.bytes_downloaded,
            "Mirror run finished"
        );
        self.events.emit(TransferEvent::run_completed(summary.clone()));

        match abort {
            Some(cause) => Err(MirrorError::Aborted {
                cause,
                summary: Box::new(summary),
            }),
            None => Ok(summary),
        }
    }

    /// Build the task for an accepted entry, or record a failure when the
    /// remote path cannot be mapped onto the destination.
    fn plan(&self, state: &mut RunState, entry: RemoteEntry) -> Option<TransferTask> {
        self.progress.task_created(entry.size);

        match paths::local_path_for(&self.config.dest_root, &entry.path) {
            Ok(local_path) => Some(TransferTask::new(entry, local_path)),
            Err(err) => {
                tracing::warn!(
                    target: "cloudmirror.engine",
                    path = %entry.path,
                    error = %err,
                    "Cannot map remote path"
                );
                self.events.emit(TransferEvent::failed(
                    entry.path.as_str(),
                    err.kind(),
                    err.user_message(),
                    0,
                ));
                state.ledger.record_failure(&entry.path, &err, 0);
                self.progress.task_failed(entry.size);
                None
            }
        }
    }

    fn skip(&self, state: &mut RunState, task: &mut TransferTask, reason: SkipReason) {
        task.skip(reason);
        tracing::debug!(
            target: "cloudmirror.engine",
            path = %task.remote_path(),
            reason = reason.as_str(),
            "Transfer skipped"
        );
        self.events
            .emit(TransferEvent::skipped(task.remote_path(), reason));
        self.progress.task_skipped(reason, task.expected_size);
        state.ledger.record_skipped(reason, task.expected_size);
    }

    fn reap(
        &self,
        state: &mut RunState,
        joined: Result<JoinOutcome, JoinError>,
        quota: &RunQuota,
    ) {
        match joined {
            Ok((id, Ok(report))) => {
                state.dispatched.remove(&id);
                let task = &report.task;
                state.ledger.record_terminal(
                    task.status(),
                    task.remote_path(),
                    report.bytes,
                    report.error.as_ref(),
                    task.attempts,
                );
            }
            Ok((id, Err(panic))) => {
                if let Some(lost) = state.dispatched.remove(&id) {
                    let message = format!("worker panicked: {}", panic_message(panic.as_ref()));
                    self.record_lost(state, id, &lost, &message, quota);
                }
            }
            Err(err) => {
                // Unmatched entries are settled after the drain.
                tracing::error!(
                    target: "cloudmirror.engine",
                    error = %err,
                    "Worker task did not complete"
                );
            }
        }
    }

    fn record_lost(
        &self,
        state: &mut RunState,
        id: u64,
        lost: &Dispatched,
        message: &str,
        quota: &RunQuota,
    ) {
        tracing::error!(
            target: "cloudmirror.engine",
            path = %lost.remote_path,
            error = message,
            "Transfer lost"
        );
        quota.release(lost.reserved);
        self.progress
            .transfer_finished(id, TransferStatus::Failed, lost.expected_size);
        self.events.emit(TransferEvent::failed(
            lost.remote_path.as_str(),
            FailureKind::Unknown,
            message,
            0,
        ));
        state.ledger.record_lost(&lost.remote_path, message);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl std::fmt::Debug for MirrorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
