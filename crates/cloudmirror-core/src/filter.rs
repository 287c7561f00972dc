//! Folder pruning and per-file filters.
//!
//! `FolderFilter` is applied once per directory during traversal so that
//! excluded subtrees are never listed. `FileFilter` decides whether a listed
//! file becomes a transfer task at all.
//!
//! Name comparisons are case-insensitive; cloud storage paths are.

use std::collections::HashSet;

use crate::domain::RemoteEntry;
use crate::settings::FilterConfig;

/// Dependency, build, IDE, VCS and temp folder names pruned by default.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    // JavaScript / Node
    "node_modules",
    ".npm",
    ".yarn",
    ".pnpm-store",
    ".bower_components",
    "bower_components",
    // Python
    "venv",
    ".venv",
    "env",
    ".env",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    ".nox",
    "site-packages",
    ".eggs",
    // Build output
    "build",
    "dist",
    "out",
    "target",
    "_build",
    ".build",
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".turbo",
    ".parcel-cache",
    ".cache",
    ".webpack",
    ".angular",
    ".expo",
    // IDE
    ".idea",
    ".vscode",
    ".vs",
    ".eclipse",
    ".settings",
    // Version control
    ".git",
    ".hg",
    ".svn",
    // Package managers
    "vendor",
    ".gradle",
    ".maven",
    "pods",
    "deriveddata",
    "cmake-build-debug",
    "cmake-build-release",
    // Logs and temp
    "logs",
    ".logs",
    "tmp",
    ".tmp",
    "temp",
    ".temp",
];

/// Decides which directories are pruned from the walk.
#[derive(Debug, Clone, Default)]
pub struct FolderFilter {
    names: HashSet<String>,
    prefixes: Vec<String>,
}

impl FolderFilter {
    /// Build a filter.
    ///
    /// With `skip_dependencies` the built-in set is included; `extra` names
    /// and `prefixes` apply either way.
    pub fn new<I, P>(skip_dependencies: bool, extra: I, prefixes: P) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut names: HashSet<String> = if skip_dependencies {
            DEFAULT_SKIP_DIRS.iter().map(|s| (*s).to_string()).collect()
        } else {
            HashSet::new()
        };
        names.extend(extra.into_iter().map(|s| s.as_ref().to_lowercase()));

        Self {
            names,
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Build the filter described by a `FilterConfig`.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            config.skip_dependencies,
            &config.extra_skip_dirs,
            &config.skip_prefixes,
        )
    }

    /// A filter that prunes nothing.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Whether a directory with this name is pruned.
    pub fn should_skip(&self, segment: &str) -> bool {
        if self.names.is_empty() && self.prefixes.is_empty() {
            return false;
        }
        let lowered = segment.to_lowercase();
        self.names.contains(&lowered) || self.prefixes.iter().any(|p| lowered.starts_with(p))
    }

    /// Whether any directory segment of a file path is pruned.
    ///
    /// The last segment is the file name and is not checked.
    pub fn excludes_path(&self, path: &str) -> bool {
        let trimmed = path.trim_matches('/');
        let Some((dirs, _file)) = trimmed.rsplit_once('/') else {
            return false;
        };
        dirs.split('/')
            .filter(|s| !s.is_empty())
            .any(|s| self.should_skip(s))
    }
}

/// Why a file was rejected by the `FileFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRejection {
    /// Extension is not in the include list.
    NotIncluded,
    /// Extension is in the exclude list.
    Excluded,
    /// Smaller than the minimum size.
    TooSmall,
    /// Larger than the maximum size.
    TooLarge,
}

/// Extension and size filter for individual files.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
    min_size: u64,
    max_size: u64,
}

impl FileFilter {
    /// Build the filter described by a `FilterConfig`.
    pub fn from_config(config: &FilterConfig) -> Self {
        let normalize = |exts: &[String]| -> HashSet<String> {
            exts.iter()
                .map(|e| normalize_extension(e))
                .filter(|e| !e.is_empty())
                .collect()
        };
        Self {
            include: normalize(&config.include_extensions),
            exclude: normalize(&config.exclude_extensions),
            min_size: config.min_size,
            max_size: config.max_size,
        }
    }

    /// Check a file entry, returning the reason it is rejected if any.
    pub fn check(&self, entry: &RemoteEntry) -> Result<(), FileRejection> {
        let ext = extension_of(entry.name());

        if !self.include.is_empty() && !self.include.contains(&ext) {
            return Err(FileRejection::NotIncluded);
        }
        if self.exclude.contains(&ext) {
            return Err(FileRejection::Excluded);
        }
        if entry.size < self.min_size {
            return Err(FileRejection::TooSmall);
        }
        if self.max_size > 0 && entry.size > self.max_size {
            return Err(FileRejection::TooLarge);
        }
        Ok(())
    }

    /// Whether the entry passes the filter.
    pub fn accepts(&self, entry: &RemoteEntry) -> bool {
        self.check(entry).is_ok()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Parse a comma-separated extension list (`"jpg, .PNG"` → `["jpg", "png"]`).
///
/// Output is lowercase, without dots, sorted and deduplicated.
pub fn parse_extensions(input: &str) -> Vec<String> {
    let mut exts: Vec<String> = input
        .split(',')
        .map(normalize_extension)
        .filter(|e| !e.is_empty())
        .collect();
    exts.sort();
    exts.dedup();
    exts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_lowercase() {
        assert!(DEFAULT_SKIP_DIRS.iter().all(|s| *s == s.to_lowercase()));
    }

    #[test]
    fn skips_dependency_dirs_case_insensitively() {
        let filter = FolderFilter::new(true, Vec::<String>::new(), Vec::<String>::new());
        assert!(filter.should_skip("node_modules"));
        assert!(filter.should_skip("Node_Modules"));
        assert!(filter.should_skip("Pods"));
        assert!(filter.should_skip("DerivedData"));
        assert!(!filter.should_skip("Photos"));
    }

    #[test]
    fn disabling_dependencies_keeps_extras_and_prefixes() {
        let filter = FolderFilter::new(false, ["Archive"], ["."]);
        assert!(!filter.should_skip("node_modules"));
        assert!(filter.should_skip("archive"));
        assert!(filter.should_skip(".hidden"));
        assert!(!filter.should_skip("visible"));
    }

    #[test]
    fn allow_all_prunes_nothing() {
        let filter = FolderFilter::allow_all();
        assert!(!filter.should_skip(".git"));
        assert!(!filter.excludes_path("/a/.git/config"));
    }

    #[test]
    fn excludes_path_checks_directory_segments_only() {
        let filter = FolderFilter::from_config(&FilterConfig::default());
        assert!(filter.excludes_path("/proj/node_modules/lodash/index.js"));
        assert!(filter.excludes_path("proj/.git/HEAD"));
        assert!(!filter.excludes_path("/proj/src/build"));
        assert!(!filter.excludes_path("/top.txt"));
    }

    #[test]
    fn file_filter_extensions() {
        let config = FilterConfig {
            include_extensions: vec!["JPG".into(), ".png".into()],
            ..FilterConfig::default()
        };
        let filter = FileFilter::from_config(&config);
        assert!(filter.accepts(&RemoteEntry::file("/a/b.jpg", 1)));
        assert!(filter.accepts(&RemoteEntry::file("/a/B.PNG", 1)));
        assert_eq!(
            filter.check(&RemoteEntry::file("/a/c.txt", 1)),
            Err(FileRejection::NotIncluded)
        );
        assert_eq!(
            filter.check(&RemoteEntry::file("/a/.jpg", 1)),
            Err(FileRejection::NotIncluded)
        );

        let exclude = FileFilter::from_config(&FilterConfig {
            exclude_extensions: vec!["tmp".into()],
            ..FilterConfig::default()
        });
        assert_eq!(
            exclude.check(&RemoteEntry::file("/x.TMP", 1)),
            Err(FileRejection::Excluded)
        );
        assert!(exclude.accepts(&RemoteEntry::file("/Makefile", 1)));
    }

    #[test]
    fn file_filter_sizes() {
        let filter = FileFilter::from_config(&FilterConfig {
            min_size: 10,
            max_size: 100,
            ..FilterConfig::default()
        });
        assert_eq!(
            filter.check(&RemoteEntry::file("/a", 9)),
            Err(FileRejection::TooSmall)
        );
        assert!(filter.accepts(&RemoteEntry::file("/a", 10)));
        assert!(filter.accepts(&RemoteEntry::file("/a", 100)));
        assert_eq!(
            filter.check(&RemoteEntry::file("/a", 101)),
            Err(FileRejection::TooLarge)
        );

        let unbounded = FileFilter::from_config(&FilterConfig::default());
        assert!(unbounded.accepts(&RemoteEntry::file("/huge", u64::MAX)));
    }

    #[test]
    fn parses_extension_lists() {
        assert_eq!(parse_extensions("jpg, .PNG,,gif , jpg"), vec!["gif", "jpg", "png"]);
        assert!(parse_extensions("").is_empty());
    }
}
