use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

use super::matcher::QueryMatcher;
use crate::errors::SearchResult;
use crate::metrics::SearchMetrics;
use crate::parsers::parser_for_path;
use crate::results::{FileDescriptor, SearchMatch};

/// Searches one file at a time with a fixed query
#[derive(Debug)]
pub struct FileProcessor {
    matcher: QueryMatcher,
    metrics: SearchMetrics,
    mmap_threshold_bytes: u64,
}

impl FileProcessor {
    pub fn new(matcher: QueryMatcher, metrics: SearchMetrics, mmap_threshold_bytes: u64) -> Self {
        Self {
            matcher,
            metrics,
            mmap_threshold_bytes,
        }
    }

    pub fn matcher(&self) -> &QueryMatcher {
        &self.matcher
    }

    /// Collects up to `limit` matches from `file`, in file order.
    ///
    /// Stops reading as soon as `limit` matches are found or `stop` is raised. Any error is
    /// returned as-is; dropping the partial matches is the caller's decision.
    pub fn process_file(
        &self,
        file: &FileDescriptor,
        limit: usize,
        stop: &AtomicBool,
    ) -> SearchResult<Vec<SearchMatch>> {
        let mut matches = Vec::new();
        if limit == 0 {
            return Ok(matches);
        }

        let parser = parser_for_path(&file.path, self.mmap_threshold_bytes)?;
        let found = parser.matches(&file.path, &self.matcher)?;
        self.metrics.record_file_read(found.strategy());
        trace!(
            "Searching {} ({:?}, {} bytes)",
            file.name,
            found.strategy(),
            file.size_bytes
        );

        for m in found {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            matches.push(m?);
            if matches.len() >= limit {
                break;
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::results::FileFormat;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn descriptor(path: &Path, format: FileFormat) -> FileDescriptor {
        FileDescriptor {
            path: path.to_path_buf(),
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            size_bytes: fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            format,
        }
    }

    fn processor(query: &str, mmap_threshold_bytes: u64) -> FileProcessor {
        FileProcessor::new(
            QueryMatcher::new(query, false),
            SearchMetrics::new(),
            mmap_threshold_bytes,
        )
    }

    #[test]
    fn test_limit_stops_early() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("many.txt");
        fs::write(&path, "hit\nhit\nmiss\nhit\nhit\n").unwrap();

        let processor = processor("hit", u64::MAX);
        let stop = AtomicBool::new(false);
        let matches = processor
            .process_file(&descriptor(&path, FileFormat::Text), 3, &stop)
            .unwrap();

        let lines: Vec<usize> = matches.iter().map(|m| m.record_number).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_zero_limit_reads_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let processor = processor("hit", u64::MAX);
        let stop = AtomicBool::new(false);
        let matches = processor
            .process_file(&descriptor(&path, FileFormat::Text), 0, &stop)
            .unwrap();
        assert!(matches.is_empty());
        assert_eq!(processor.metrics.get_stats().buffered_files, 0);
    }

    #[test]
    fn test_stop_flag_halts_reading() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("many.sql");
        fs::write(&path, "hit\nhit\n").unwrap();

        let processor = processor("hit", u64::MAX);
        let stop = AtomicBool::new(true);
        let matches = processor
            .process_file(&descriptor(&path, FileFormat::Sql), 10, &stop)
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_records_read_strategy() {
        let dir = tempdir().unwrap();
        let text = dir.path().join("big.txt");
        let csv = dir.path().join("rows.csv");
        fs::write(&text, "hit\n").unwrap();
        fs::write(&csv, "hit,1\n").unwrap();

        let processor = processor("hit", 0);
        let stop = AtomicBool::new(false);
        processor
            .process_file(&descriptor(&text, FileFormat::Text), 10, &stop)
            .unwrap();
        processor
            .process_file(&descriptor(&csv, FileFormat::Csv), 10, &stop)
            .unwrap();

        let stats = processor.metrics.get_stats();
        assert_eq!(stats.mmap_files, 1);
        assert_eq!(stats.csv_files, 1);
        assert_eq!(stats.buffered_files, 0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.csv");

        let processor = processor("hit", u64::MAX);
        let stop = AtomicBool::new(false);
        let result = processor.process_file(&descriptor(&path, FileFormat::Csv), 10, &stop);
        assert!(matches!(result, Err(SearchError::FileAccess { .. })));
    }
}
