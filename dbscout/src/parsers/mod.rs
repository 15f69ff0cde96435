//! Streaming record producers for the supported file formats.
//!
//! Every format is read lazily: a [`Records`] iterator pulls one line or row at a time, so a
//! consumer that stops iterating stops reading the file. [`parser_for_path`] is the single
//! dispatch point from a file extension to a [`FileParser`].
mod decode;
mod lines;
mod rows;

pub use decode::decode_lossy;
pub use lines::{BufferedLines, LineRecords, MappedLines};
pub use rows::{CsvRows, MAX_FIELD_BYTES};

use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};
use crate::metrics::ReadStrategy;
use crate::results::{FileFormat, SearchMatch};
use crate::search::matcher::QueryMatcher;

/// One line or row with its 1-based position in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub number: usize,
    pub text: String,
}

/// Parser for one file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileParser {
    Text { mmap_threshold_bytes: u64 },
    Sql { mmap_threshold_bytes: u64 },
    Csv,
}

/// Selects the parser for a file from its extension.
///
/// Fails with a configuration error for extensions no parser handles.
pub fn parser_for_path(path: &Path, mmap_threshold_bytes: u64) -> SearchResult<FileParser> {
    match FileFormat::from_path(path) {
        Some(FileFormat::Text) => Ok(FileParser::Text {
            mmap_threshold_bytes,
        }),
        Some(FileFormat::Sql) => Ok(FileParser::Sql {
            mmap_threshold_bytes,
        }),
        Some(FileFormat::Csv) => Ok(FileParser::Csv),
        None => {
            let ext = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            Err(SearchError::config_error(format!(
                "Unsupported file extension: '{}' (supported: .csv, .txt, .sql)",
                ext
            )))
        }
    }
}

impl FileParser {
    pub fn format(&self) -> FileFormat {
        match self {
            Self::Text { .. } => FileFormat::Text,
            Self::Sql { .. } => FileFormat::Sql,
            Self::Csv => FileFormat::Csv,
        }
    }

    /// Opens the file and returns its records in file order
    pub fn records(&self, path: &Path) -> SearchResult<Records> {
        match *self {
            Self::Text {
                mmap_threshold_bytes,
            }
            | Self::Sql {
                mmap_threshold_bytes,
            } => LineRecords::open(path, mmap_threshold_bytes).map(Records::Lines),
            Self::Csv => CsvRows::open(path).map(Records::Rows),
        }
    }

    /// Opens the file and returns the records that match the query
    pub fn matches<'m>(
        &self,
        path: &Path,
        matcher: &'m QueryMatcher,
    ) -> SearchResult<FileMatches<'m>> {
        let records = self.records(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(FileMatches {
            records,
            matcher,
            file_name,
            file_path: path.to_path_buf(),
            format: self.format(),
        })
    }
}

/// Records of a file in any supported format
#[derive(Debug)]
pub enum Records {
    Lines(LineRecords),
    Rows(CsvRows),
}

impl Records {
    pub fn strategy(&self) -> ReadStrategy {
        match self {
            Self::Lines(lines) => lines.strategy(),
            Self::Rows(_) => ReadStrategy::Csv,
        }
    }
}

impl Iterator for Records {
    type Item = SearchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Lines(lines) => lines.next(),
            Self::Rows(rows) => rows.next(),
        }
    }
}

/// Matching records of one file, in file order
#[derive(Debug)]
pub struct FileMatches<'m> {
    records: Records,
    matcher: &'m QueryMatcher,
    file_name: String,
    file_path: PathBuf,
    format: FileFormat,
}

impl FileMatches<'_> {
    pub fn strategy(&self) -> ReadStrategy {
        self.records.strategy()
    }
}

impl Iterator for FileMatches<'_> {
    type Item = SearchResult<SearchMatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            if !self.matcher.is_match(&record.text) {
                continue;
            }

            let content = match self.format {
                FileFormat::Csv => record.text,
                FileFormat::Text | FileFormat::Sql => record.text.trim().to_string(),
            };
            return Some(Ok(SearchMatch {
                file_name: self.file_name.clone(),
                file_path: self.file_path.clone(),
                record_number: record.number,
                content,
                format: self.format,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn matches_in(path: &Path, query: &str, case_sensitive: bool) -> Vec<(usize, String)> {
        let matcher = QueryMatcher::new(query, case_sensitive);
        parser_for_path(path, u64::MAX)
            .unwrap()
            .matches(path, &matcher)
            .unwrap()
            .map(|m| m.map(|m| (m.record_number, m.content)))
            .collect::<SearchResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_dispatch_by_extension() {
        assert_eq!(
            parser_for_path(Path::new("a.txt"), 7).unwrap(),
            FileParser::Text {
                mmap_threshold_bytes: 7
            }
        );
        assert_eq!(
            parser_for_path(Path::new("b.SQL"), 7).unwrap().format(),
            FileFormat::Sql
        );
        assert_eq!(
            parser_for_path(Path::new("c.csv"), 7).unwrap(),
            FileParser::Csv
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parser_for_path(Path::new("data.json"), 0).unwrap_err();
        assert!(matches!(err, SearchError::ConfigError(_)));
        assert!(err.to_string().contains(".json"));

        assert!(parser_for_path(Path::new("README"), 0).is_err());
    }

    #[test]
    fn test_text_matches_are_trimmed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "alpha\n   padded alpha   \nbeta\n").unwrap();

        assert_eq!(
            matches_in(&path, "alpha", false),
            vec![(1, "alpha".to_string()), (2, "padded alpha".to_string())]
        );
    }

    #[test]
    fn test_csv_matches_flattened_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        fs::write(&path, "id,name\n1,alpha\n2,beta").unwrap();

        assert_eq!(
            matches_in(&path, "alpha", false),
            vec![(2, "1, alpha".to_string())]
        );
        // The separator is part of the flattened row
        assert_eq!(
            matches_in(&path, "2, beta", false),
            vec![(3, "2, beta".to_string())]
        );
    }

    #[test]
    fn test_sql_case_sensitivity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        fs::write(
            &path,
            "INSERT INTO users VALUES (1, 'john smith');\nINSERT INTO users VALUES (2, 'Jane');\n",
        )
        .unwrap();

        assert_eq!(matches_in(&path, "John", false).len(), 1);
        assert!(matches_in(&path, "John", true).is_empty());
        assert_eq!(matches_in(&path, "Jane", true).len(), 1);
    }

    #[test]
    fn test_match_carries_file_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        fs::write(&path, "select 1;\n").unwrap();

        let matcher = QueryMatcher::new("select", false);
        let found: Vec<SearchMatch> = parser_for_path(&path, 0)
            .unwrap()
            .matches(&path, &matcher)
            .unwrap()
            .collect::<SearchResult<_>>()
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name, "dump.sql");
        assert_eq!(found[0].file_path, path);
        assert_eq!(found[0].format, FileFormat::Sql);
    }
}
