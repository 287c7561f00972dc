//! Terminal progress rendering.
//!
//! Presentation only: polls `ProgressAggregator::snapshot()` and never
//! touches the engine otherwise. Draws an indicatif bar on a terminal and
//! prints periodic plain lines when stdout is redirected.

use std::fmt::Write;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use cloudmirror_engine::{ProgressAggregator, ProgressSnapshot};

/// How often the aggregator is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Minimum spacing of plain progress lines.
const PLAIN_INTERVAL: Duration = Duration::from_secs(5);

/// Background task drawing progress until [`ProgressRenderer::finish`].
pub struct ProgressRenderer {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl ProgressRenderer {
    /// Start rendering, auto-detecting terminal capability.
    pub fn spawn(progress: Arc<ProgressAggregator>) -> Self {
        let display = if io::stdout().is_terminal() {
            Display::Fancy(FancyProgress::new())
        } else {
            Display::Plain(PlainProgress::new())
        };
        let stop = CancellationToken::new();
        let task = tokio::spawn(render_loop(progress, display, stop.clone()));
        Self { stop, task }
    }

    /// Draw the final state and clear the bar.
    pub async fn finish(self) {
        self.stop.cancel();
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "Progress renderer ended abnormally");
        }
    }
}

async fn render_loop(
    progress: Arc<ProgressAggregator>,
    mut display: Display,
    stop: CancellationToken,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => display.update(&progress.snapshot()),
        }
    }
    display.finish(&progress.snapshot());
}

enum Display {
    Fancy(FancyProgress),
    Plain(PlainProgress),
}

impl Display {
    fn update(&mut self, snapshot: &ProgressSnapshot) {
        match self {
            Self::Fancy(inner) => inner.update(snapshot),
            Self::Plain(inner) => inner.update(snapshot),
        }
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot) {
        match self {
            Self::Fancy(inner) => inner.finish(),
            Self::Plain(inner) => inner.print(snapshot),
        }
    }
}

struct FancyProgress {
    bar: ProgressBar,
}

impl FancyProgress {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stdout());
        bar.set_style(Self::bar_style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn update(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_length(snapshot.bytes_total_estimate);
        self.bar
            .set_position(settled_bytes(snapshot).min(snapshot.bytes_total_estimate));
        self.bar.set_message(status_line(snapshot));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {bar:28.cyan/blue} {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

struct PlainProgress {
    last_print: Option<Instant>,
}

impl PlainProgress {
    const fn new() -> Self {
        Self { last_print: None }
    }

    fn update(&mut self, snapshot: &ProgressSnapshot) {
        if self
            .last_print
            .is_some_and(|last| last.elapsed() < PLAIN_INTERVAL)
        {
            return;
        }
        self.print(snapshot);
    }

    fn print(&mut self, snapshot: &ProgressSnapshot) {
        println!("{:>3.0}% {}", snapshot.percent(), status_line(snapshot));
        self.last_print = Some(Instant::now());
    }
}

fn settled_bytes(snapshot: &ProgressSnapshot) -> u64 {
    snapshot.bytes_done.saturating_add(snapshot.bytes_skipped)
}

/// One-line description of a snapshot.
///
/// The file total carries a `+` while the listing is still running.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn status_line(snapshot: &ProgressSnapshot) -> String {
    let more = if snapshot.discovery_complete { "" } else { "+" };
    let speed = HumanBytes(snapshot.speed_bps.max(0.0) as u64);
    let eta = snapshot
        .eta
        .map_or_else(|| "--".to_string(), |eta| HumanDuration(eta).to_string());

    let mut line = format!(
        "{}/{}{more} files | {} / {} | {speed}/s | ETA {eta} | {} active",
        snapshot.completed_files,
        snapshot.total_files,
        HumanBytes(settled_bytes(snapshot)),
        HumanBytes(snapshot.bytes_total_estimate),
        snapshot.active_workers,
    );
    if snapshot.failed_files > 0 {
        let _ = write!(line, " | {} failed", snapshot.failed_files);
    }
    if snapshot.retries > 0 {
        let _ = write!(line, " | {} retries", snapshot.retries);
    }
    if snapshot.rate_limit_hits > 0 {
        let _ = write!(line, " | throttled x{}", snapshot.rate_limit_hits);
    }
    line
}
