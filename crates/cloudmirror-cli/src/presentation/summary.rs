//! End-of-run summary.

use std::fmt::Write;

use indicatif::{HumanBytes, HumanDuration};

use cloudmirror_core::{RunOutcome, RunSummary};

/// Render the summary as printed at the end of a run.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let elapsed = summary.duration().to_std().unwrap_or_default();

    let headline = match summary.outcome {
        RunOutcome::Completed => "Mirror complete",
        RunOutcome::QuotaReached => "Mirror stopped: per-run byte quota reached",
        RunOutcome::Interrupted => "Mirror interrupted",
    };
    let _ = writeln!(out, "{headline} in {}", HumanDuration(elapsed));
    let _ = writeln!(
        out,
        "  Downloaded: {} file(s), {}",
        summary.succeeded,
        HumanBytes(summary.bytes_downloaded)
    );
    let _ = writeln!(
        out,
        "  Skipped:    {} already present ({}), {} other",
        summary.skipped_existing,
        HumanBytes(summary.bytes_skipped),
        summary.skipped_other
    );
    if summary.filtered_files > 0 || summary.pruned_directories > 0 {
        let _ = writeln!(
            out,
            "  Filtered:   {} file(s), {} folder(s) pruned",
            summary.filtered_files, summary.pruned_directories
        );
    }
    let _ = writeln!(out, "  Failed:     {}", summary.failed);

    for failure in &summary.failures {
        let _ = writeln!(
            out,
            "    {} [{}, {} attempt(s)]: {}",
            failure.remote_path, failure.kind, failure.attempts, failure.error
        );
    }
    out
}

/// Print the summary to stdout.
pub fn print_summary(summary: &RunSummary) {
    print!("{}", format_summary(summary));
}
