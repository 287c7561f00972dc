//! CLI entry point.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cloudmirror_cli::{Cli, handlers, signals};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before parsing so MIRROR_* fallbacks apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    signals::spawn_interrupt_handler(cancel.clone())?;

    if let Err(err) = handlers::mirror::execute(&cli, cancel).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}
