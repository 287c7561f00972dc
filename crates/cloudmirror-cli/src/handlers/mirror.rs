//! The mirror command.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cloudmirror_core::{LoggingTransferEmitter, RunSummary};
use cloudmirror_engine::{MirrorEngine, MirrorEngineDeps};

use crate::config::build_config;
use crate::error::CliError;
use crate::parser::Cli;
use crate::presentation::{ProgressRenderer, print_summary};
use crate::source::{DirectorySource, ensure_source};

/// Run one mirror pass as described by `cli`.
///
/// The summary is printed even when the run is aborted part way.
/// Per-file failures turn into [`CliError::Failures`] unless
/// `--allow-failures` is given.
pub async fn execute(cli: &Cli, cancel: CancellationToken) -> Result<RunSummary, CliError> {
    let config = build_config(cli)?;
    ensure_source(&cli.source)
        .await
        .map_err(|e| CliError::Io(format!("source {}: {e}", cli.source.display())))?;

    tracing::info!(
        source = %cli.source.display(),
        dest = %config.dest_root.display(),
        root = %config.remote_root,
        workers = config.workers,
        dry_run = config.dry_run,
        "Starting mirror"
    );

    let source = Arc::new(DirectorySource::new(&cli.source));
    let engine = MirrorEngine::new(MirrorEngineDeps {
        listing: source.clone(),
        fetcher: source,
        event_emitter: Arc::new(LoggingTransferEmitter::new()),
        config,
    });

    let renderer = ProgressRenderer::spawn(engine.progress());
    let result = engine.run(cancel).await;
    renderer.finish().await;

    match result {
        Ok(summary) => {
            print_summary(&summary);
            check_failures(&summary, cli.allow_failures)?;
            Ok(summary)
        }
        Err(err) => {
            if let Some(partial) = err.partial_summary() {
                print_summary(partial);
            }
            Err(err.into())
        }
    }
}

/// Turn per-file failures into an error unless they are tolerated.
fn check_failures(summary: &RunSummary, allow_failures: bool) -> Result<(), CliError> {
    if summary.has_failures() && !allow_failures {
        return Err(CliError::Failures(summary.failed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;
    use cloudmirror_core::{RunOutcome, TransferError};
    use cloudmirror_engine::{RunLedger, WalkStats};

    use super::*;

    fn cli(source: &Path, dest: &Path, extra: &[&str]) -> Cli {
        let mut argv = vec![
            "cloudmirror".to_string(),
            "--source".to_string(),
            source.display().to_string(),
            "--dest".to_string(),
            dest.display().to_string(),
        ];
        argv.extend(extra.iter().map(ToString::to_string));
        Cli::parse_from(argv)
    }

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("app/node_modules/left-pad")).unwrap();
        std::fs::write(dir.path().join("docs/report.pdf"), vec![7u8; 3000]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"remember the milk").unwrap();
        std::fs::write(dir.path().join("app/node_modules/left-pad/index.js"), b"x").unwrap();
        dir
    }

    #[tokio::test]
    async fn mirrors_directory_source() {
        let src = source_tree();
        let dest = tempfile::tempdir().unwrap();

        let summary = execute(&cli(src.path(), dest.path(), &[]), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.bytes_downloaded, 3017);
        assert_eq!(
            std::fs::read(dest.path().join("notes.txt")).unwrap(),
            b"remember the milk"
        );
        assert!(!dest.path().join("app/node_modules").exists());
    }

    #[tokio::test]
    async fn second_run_skips_everything() {
        let src = source_tree();
        let dest = tempfile::tempdir().unwrap();
        let args = cli(src.path(), dest.path(), &[]);

        execute(&args, CancellationToken::new()).await.unwrap();
        let again = execute(&args, CancellationToken::new()).await.unwrap();

        assert_eq!(again.succeeded, 0);
        assert_eq!(again.skipped_existing, 2);
        assert_eq!(again.bytes_skipped, 3017);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let src = source_tree();
        let dest = tempfile::tempdir().unwrap();

        let summary = execute(
            &cli(src.path(), dest.path(), &["--dry-run"]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped_other, 2);
        assert!(!dest.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn missing_source_is_an_io_error() {
        let dest = tempfile::tempdir().unwrap();
        let missing = dest.path().join("not-there");

        let err = execute(&cli(&missing, dest.path(), &[]), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn failures_set_the_exit_status_unless_allowed() {
        let mut ledger = RunLedger::new();
        ledger.record_success(10);
        ledger.record_failure("/gone.txt", &TransferError::not_found("/gone.txt"), 1);
        let summary = ledger.finish(RunOutcome::Completed, WalkStats::default());

        let err = check_failures(&summary, false).unwrap_err();
        assert!(matches!(err, CliError::Failures(1)));
        assert_eq!(err.exit_code(), 2);
        assert!(check_failures(&summary, true).is_ok());

        let clean = RunLedger::new().finish(RunOutcome::Completed, WalkStats::default());
        assert!(check_failures(&clean, false).is_ok());
    }
}
