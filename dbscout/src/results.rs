/// Value types shared by the index, the parsers and the search engine.
///
/// All of them are immutable once built: a `FileDescriptor` is produced by an index refresh,
/// a `SearchMatch` by a parser, and `SearchStats` once per search call. Matches are handed out
/// behind an `Arc<[SearchMatch]>` so a cached answer can be returned without copying it.
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::normalize_extension;

/// The closed set of file formats the parsers understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Text,
    Sql,
}

impl FileFormat {
    /// Maps an extension (with or without the leading dot, any case) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match normalize_extension(ext).as_str() {
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Text),
            "sql" => Some(Self::Sql),
            _ => None,
        }
    }

    /// Maps a path's extension to a format
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Text => write!(f, "txt"),
            Self::Sql => write!(f, "sql"),
        }
    }
}

/// Metadata about one indexed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Full path to the file
    pub path: PathBuf,
    /// File name; unique within the indexed directory
    pub name: String,
    /// Size in bytes at index time
    pub size_bytes: u64,
    /// Format derived from the extension at index time
    pub format: FileFormat,
}

/// A single matching record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Name of the file containing the match
    pub file_name: String,
    /// Full path to the file
    pub file_path: PathBuf,
    /// 1-indexed line (text, SQL) or row (CSV) number
    pub record_number: usize,
    /// The matched line, or the row's fields joined with ", "
    pub content: String,
    /// Format of the file the match came from
    pub format: FileFormat,
}

/// Summary of one search call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchStats {
    pub files_searched: usize,
    pub total_matches: usize,
    pub duration_seconds: f64,
}

/// Matches and statistics returned by a search
#[derive(Debug, Clone)]
pub struct SearchOutput {
    /// Matches in discovery order; shared with the engine's result cache
    pub matches: Arc<[SearchMatch]>,
    pub stats: SearchStats,
}

impl SearchOutput {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchMatch> {
        self.matches.iter()
    }
}

/// Formats a byte count as B, KB, MB or GB with two decimals above one kilobyte
pub fn format_size(size_bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = size_bytes as f64;
    if size < KB {
        format!("{} B", size_bytes)
    } else if size < MB {
        format!("{:.2} KB", size / KB)
    } else if size < GB {
        format!("{:.2} MB", size / MB)
    } else {
        format!("{:.2} GB", size / GB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension("csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_extension(".TXT"), Some(FileFormat::Text));
        assert_eq!(FileFormat::from_extension("Sql"), Some(FileFormat::Sql));
        assert_eq!(FileFormat::from_extension("json"), None);
        assert_eq!(FileFormat::from_extension(""), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("base/users.CSV")),
            Some(FileFormat::Csv)
        );
        assert_eq!(FileFormat::from_path(Path::new("base/README")), None);
        assert_eq!(FileFormat::from_path(Path::new("base/archive.tar.gz")), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_search_output_accessors() {
        let matches: Arc<[SearchMatch]> = vec![SearchMatch {
            file_name: "a.txt".to_string(),
            file_path: PathBuf::from("base/a.txt"),
            record_number: 1,
            content: "alpha".to_string(),
            format: FileFormat::Text,
        }]
        .into();
        let output = SearchOutput {
            matches,
            stats: SearchStats {
                files_searched: 1,
                total_matches: 1,
                duration_seconds: 0.0,
            },
        };

        assert_eq!(output.len(), 1);
        assert!(!output.is_empty());
        assert_eq!(output.iter().next().map(|m| m.record_number), Some(1));
    }
}
