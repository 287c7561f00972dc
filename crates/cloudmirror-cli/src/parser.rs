//! Command-line arguments.
//!
//! Every knob can also come from a `MIRROR_*` environment variable (or a
//! `.env` file, loaded before parsing).

use std::path::PathBuf;

use clap::Parser;

/// Mirror a remote storage tree to local disk.
#[derive(Debug, Parser)]
#[command(name = "cloudmirror")]
#[command(about = "Mirror a remote storage tree to local disk")]
#[command(version)]
pub struct Cli {
    /// Directory that stands in for the remote account (a mounted or synced folder)
    #[arg(long, env = "MIRROR_SOURCE")]
    pub source: PathBuf,

    /// Local destination root
    #[arg(long, env = "MIRROR_DEST")]
    pub dest: PathBuf,

    /// Remote sub-path to mirror
    #[arg(long, env = "MIRROR_ROOT", default_value = "/")]
    pub root: String,

    /// Concurrent transfers (1-20)
    #[arg(long, env = "MIRROR_WORKERS", default_value_t = cloudmirror_core::settings::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Stop admitting files after this many bytes (e.g. 10GB, 500MB); 0 = unlimited
    #[arg(long = "max-per-run", env = "MIRROR_MAX_PER_RUN")]
    pub max_per_run: Option<String>,

    /// List what would be transferred without downloading anything
    #[arg(long, env = "MIRROR_DRY_RUN")]
    pub dry_run: bool,

    /// Only mirror these extensions (comma-separated)
    #[arg(long = "include-ext", env = "MIRROR_INCLUDE_EXT")]
    pub include_ext: Option<String>,

    /// Never mirror these extensions (comma-separated)
    #[arg(long = "exclude-ext", env = "MIRROR_EXCLUDE_EXT")]
    pub exclude_ext: Option<String>,

    /// Skip files smaller than this (e.g. 1KB)
    #[arg(long = "min-size", env = "MIRROR_MIN_SIZE")]
    pub min_size: Option<String>,

    /// Skip files larger than this (e.g. 2GB)
    #[arg(long = "max-size", env = "MIRROR_MAX_SIZE")]
    pub max_size: Option<String>,

    /// Also mirror dependency and build folders (node_modules, target, .git, ...)
    #[arg(long = "no-skip-deps", env = "MIRROR_NO_SKIP_DEPS")]
    pub no_skip_deps: bool,

    /// Extra folder names to skip (comma-separated)
    #[arg(long = "skip-dirs", env = "MIRROR_SKIP_DIRS")]
    pub skip_dirs: Option<String>,

    /// Attempts per file before giving up
    #[arg(long = "max-retries", env = "MIRROR_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Exit with status 0 even when some files failed (default: status 2)
    #[arg(long = "allow-failures", env = "MIRROR_ALLOW_FAILURES")]
    pub allow_failures: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_and_defaults() {
        let cli = Cli::parse_from(["cloudmirror", "--source", "/mnt/cloud", "--dest", "/backup"]);
        assert_eq!(cli.source, PathBuf::from("/mnt/cloud"));
        assert_eq!(cli.dest, PathBuf::from("/backup"));
        assert_eq!(cli.root, "/");
        assert_eq!(cli.workers, 6);
        assert!(!cli.dry_run);
        assert!(cli.max_per_run.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "cloudmirror",
            "--source",
            "/s",
            "--dest",
            "/d",
            "--root",
            "/Photos",
            "--workers",
            "12",
            "--max-per-run",
            "10GB",
            "--dry-run",
            "--include-ext",
            "jpg,png",
            "--no-skip-deps",
            "--max-retries",
            "3",
            "--allow-failures",
            "-v",
        ]);
        assert_eq!(cli.root, "/Photos");
        assert_eq!(cli.workers, 12);
        assert_eq!(cli.max_per_run.as_deref(), Some("10GB"));
        assert!(cli.dry_run);
        assert_eq!(cli.include_ext.as_deref(), Some("jpg,png"));
        assert!(cli.no_skip_deps);
        assert_eq!(cli.max_retries, Some(3));
        assert!(cli.allow_failures);
        assert!(cli.verbose);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
