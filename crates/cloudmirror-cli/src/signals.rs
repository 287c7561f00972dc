//! OS signal wiring.
//!
//! The first Ctrl-C or SIGTERM cancels the run so in-flight transfers can
//! stop cleanly. A second one exits immediately.

use std::io;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit status used when a second interrupt forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Install the interrupt handlers and spawn the task that watches them.
///
/// Handlers are registered before this returns, so a signal sent right
/// after the call is never lost to the default action.
pub fn spawn_interrupt_handler(cancel: CancellationToken) -> io::Result<JoinHandle<()>> {
    let mut interrupts = Interrupts::new()?;
    Ok(tokio::spawn(async move {
        if !interrupts.next().await {
            return;
        }
        eprintln!("Interrupt received, finishing in-flight transfers (interrupt again to quit)");
        cancel.cancel();
        if interrupts.next().await {
            std::process::exit(FORCED_EXIT_CODE);
        }
    }))
}

struct Interrupts {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Interrupts {
    fn new() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Wait for the next interrupt; `false` once none can arrive anymore.
    #[cfg(unix)]
    async fn next(&mut self) -> bool {
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.is_ok(),
            sig = self.terminate.recv() => sig.is_some(),
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) -> bool {
        tokio::signal::ctrl_c().await.is_ok()
    }
}
