//! Turns parsed arguments into a validated `MirrorConfig`.

use cloudmirror_core::{FilterConfig, MirrorConfig, RetryConfig, parse_extensions, parse_size};

use crate::error::CliError;
use crate::parser::{Cli, split_list};

/// Build the engine configuration from the command line.
pub fn build_config(cli: &Cli) -> Result<MirrorConfig, CliError> {
    let filter = FilterConfig {
        skip_dependencies: !cli.no_skip_deps,
        extra_skip_dirs: cli.skip_dirs.as_deref().map(split_list).unwrap_or_default(),
        include_extensions: cli
            .include_ext
            .as_deref()
            .map(parse_extensions)
            .unwrap_or_default(),
        exclude_extensions: cli
            .exclude_ext
            .as_deref()
            .map(parse_extensions)
            .unwrap_or_default(),
        min_size: optional_size(cli.min_size.as_deref())?,
        max_size: optional_size(cli.max_size.as_deref())?,
        ..FilterConfig::default()
    };

    let mut retry = RetryConfig::default();
    if let Some(attempts) = cli.max_retries {
        retry = retry.with_max_attempts(attempts);
    }

    let config = MirrorConfig::new(&cli.root, &cli.dest)
        .with_workers(cli.workers)
        .with_max_bytes_per_run(optional_size(cli.max_per_run.as_deref())?)
        .with_dry_run(cli.dry_run)
        .with_retry(retry)
        .with_filter(filter);

    config.validate()?;
    Ok(config)
}

fn optional_size(input: Option<&str>) -> Result<u64, CliError> {
    input.map_or(Ok(0), |s| parse_size(s).map_err(CliError::from))
}
