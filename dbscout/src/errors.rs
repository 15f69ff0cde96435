/// Error types for dbscout.
///
/// Errors fall into two groups. Setup faults (a root path that is not a directory, an
/// unsupported extension reaching parser dispatch, a bad query, a config file that cannot be
/// read) are returned to the caller. File-level faults (`FileAccess`, `Parsing`) raised while a
/// search is scanning one file are downgraded by the search engine to a logged warning so the
/// remaining files are still searched:
///
/// ```rust,ignore
/// match engine.search(query) {
///     Ok(output) => render(output),
///     Err(SearchError::InvalidQuery(_)) => prompt_again(),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during indexing and search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}", parsing_message(path, *line, details))]
    Parsing {
        path: PathBuf,
        line: Option<u64>,
        details: String,
    },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

fn parsing_message(path: &Path, line: Option<u64>, details: &str) -> String {
    match line {
        Some(line) => format!(
            "Parsing error in {} at line {}: {}",
            path.display(),
            line,
            details
        ),
        None => format!("Parsing error in {}: {}", path.display(), details),
    }
}

impl SearchError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn parsing_error(
        path: impl Into<PathBuf>,
        line: Option<u64>,
        details: impl Into<String>,
    ) -> Self {
        Self::Parsing {
            path: path.into(),
            line,
            details: details.into(),
        }
    }

    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Whether this error concerns a single file's contents and may be isolated
    /// to that file during a multi-file search.
    pub fn is_file_level(&self) -> bool {
        matches!(self, Self::FileAccess { .. } | Self::Parsing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SearchError::config_error("not a directory");
        assert!(matches!(err, SearchError::ConfigError(_)));

        let err = SearchError::file_access(
            "data.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SearchError::FileAccess { .. }));

        let err = SearchError::parsing_error("data.csv", Some(3), "field too large");
        assert!(matches!(err, SearchError::Parsing { line: Some(3), .. }));

        let err = SearchError::invalid_query("empty");
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::config_error("Unsupported file extension: .json");
        assert_eq!(
            err.to_string(),
            "Configuration error: Unsupported file extension: .json"
        );

        let err = SearchError::parsing_error("users.csv", Some(12), "field too large");
        assert_eq!(
            err.to_string(),
            "Parsing error in users.csv at line 12: field too large"
        );

        let err = SearchError::parsing_error("users.csv", None, "bad quoting");
        assert_eq!(err.to_string(), "Parsing error in users.csv: bad quoting");

        let err = SearchError::file_access(
            "dump.sql",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "Failed to access dump.sql: gone");

        let err = SearchError::invalid_query("Search query cannot be empty");
        assert_eq!(
            err.to_string(),
            "Invalid query: Search query cannot be empty"
        );
    }

    #[test]
    fn test_file_level_classification() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(SearchError::file_access("a.txt", io_err).is_file_level());
        assert!(SearchError::parsing_error("a.csv", None, "x").is_file_level());
        assert!(!SearchError::config_error("x").is_file_level());
        assert!(!SearchError::invalid_query("x").is_file_level());
    }
}
