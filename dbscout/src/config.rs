use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Configuration for a search engine instance.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.dbscout.yaml` in the current directory
/// 3. Global `$HOME/.config/dbscout/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Directory holding the database files (not searched recursively)
/// root_directory: "base"
///
/// # Extensions that are indexed
/// recognized_extensions: ["csv", "txt", "sql"]
///
/// # Hard cap on matches returned per search
/// max_results: 10000
///
/// case_sensitive: false
///
/// # Worker threads used by parallel searches
/// parallel_workers: 4
///
/// # Text and SQL files larger than this are memory-mapped
/// mmap_threshold_bytes: 10485760
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// Every field is optional in the file; missing fields take the defaults shown above.
/// The engine treats all values as already validated: `max_results` and
/// `parallel_workers` are non-zero by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directory whose immediate entries are indexed
    #[serde(default = "default_root_directory")]
    pub root_directory: PathBuf,

    /// Extensions that are indexed, without the leading dot
    #[serde(default = "default_extensions")]
    pub recognized_extensions: Vec<String>,

    /// Maximum number of matches a single search returns
    #[serde(default = "default_max_results")]
    pub max_results: NonZeroUsize,

    /// Whether matching distinguishes case
    #[serde(default)]
    pub case_sensitive: bool,

    /// Number of worker threads for parallel searches
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: NonZeroUsize,

    /// Text and SQL files strictly larger than this are read through a memory map
    #[serde(default = "default_mmap_threshold")]
    pub mmap_threshold_bytes: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

pub const DEFAULT_MAX_RESULTS: usize = 10_000;
pub const DEFAULT_PARALLEL_WORKERS: usize = 4;
pub const DEFAULT_MMAP_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

fn default_root_directory() -> PathBuf {
    PathBuf::from("base")
}

fn default_extensions() -> Vec<String> {
    vec!["csv".to_string(), "txt".to_string(), "sql".to_string()]
}

fn default_max_results() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MAX_RESULTS).unwrap_or(NonZeroUsize::MIN)
}

fn default_parallel_workers() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_PARALLEL_WORKERS).unwrap_or(NonZeroUsize::MIN)
}

fn default_mmap_threshold() -> u64 {
    DEFAULT_MMAP_THRESHOLD
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Strips a leading dot and lowercases an extension so ".CSV" and "csv" compare equal.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            root_directory: default_root_directory(),
            recognized_extensions: default_extensions(),
            max_results: default_max_results(),
            case_sensitive: false,
            parallel_workers: default_parallel_workers(),
            mmap_threshold_bytes: default_mmap_threshold(),
            log_level: default_log_level(),
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_directory: Option<PathBuf>,
    pub max_results: Option<NonZeroUsize>,
    pub case_sensitive: bool,
    pub parallel_workers: Option<NonZeroUsize>,
    pub mmap_threshold_bytes: Option<u64>,
    pub log_level: Option<String>,
}

impl SearchConfig {
    /// Creates a default configuration rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an optional explicit file.
    /// The explicit file must exist; the default locations are used only if present.
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("dbscout/config.yaml")),
            Some(PathBuf::from(".dbscout.yaml")),
        ];

        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let mut config: SearchConfig = builder.build()?.try_deserialize()?;
        config.recognized_extensions = config
            .recognized_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();
        Ok(config)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(root) = cli.root_directory {
            self.root_directory = root;
        }
        if let Some(max_results) = cli.max_results {
            self.max_results = max_results;
        }
        if cli.case_sensitive {
            self.case_sensitive = true;
        }
        if let Some(workers) = cli.parallel_workers {
            self.parallel_workers = workers;
        }
        if let Some(threshold) = cli.mmap_threshold_bytes {
            self.mmap_threshold_bytes = threshold;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Whether files with this extension are indexed
    pub fn recognizes(&self, ext: &str) -> bool {
        let ext = normalize_extension(ext);
        self.recognized_extensions
            .iter()
            .any(|known| normalize_extension(known) == ext)
    }

    /// Rejects an empty extension set, which would make every search trivially empty.
    pub fn validate(&self) -> SearchResult<()> {
        if self.recognized_extensions.is_empty() {
            return Err(SearchError::config_error(
                "At least one recognized extension is required",
            ));
        }
        Ok(())
    }
}
