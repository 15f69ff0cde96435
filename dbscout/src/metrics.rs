use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counters describing how searches were carried out
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // Read strategy
    buffered_files: Arc<AtomicU64>,
    mmap_files: Arc<AtomicU64>,
    csv_files: Arc<AtomicU64>,

    // Fault isolation
    failed_files: Arc<AtomicU64>,
    skipped_files: Arc<AtomicU64>,

    // Result cache
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

/// How a file's records were read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    Buffered,
    Mapped,
    Csv,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            buffered_files: Arc::new(AtomicU64::new(0)),
            mmap_files: Arc::new(AtomicU64::new(0)),
            csv_files: Arc::new(AtomicU64::new(0)),
            failed_files: Arc::new(AtomicU64::new(0)),
            skipped_files: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records which strategy opened a file
    pub fn record_file_read(&self, strategy: ReadStrategy) {
        let counter = match strategy {
            ReadStrategy::Buffered => &self.buffered_files,
            ReadStrategy::Mapped => &self.mmap_files,
            ReadStrategy::Csv => &self.csv_files,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a file whose search failed and contributed no matches
    pub fn record_failure(&self) {
        self.failed_files.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a parallel unit that never ran because the result cap was reached
    pub fn record_skipped(&self) {
        self.skipped_files.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a result cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn failed_files(&self) -> u64 {
        self.failed_files.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a snapshot of all counters
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffered_files: self.buffered_files.load(Ordering::Relaxed),
            mmap_files: self.mmap_files.load(Ordering::Relaxed),
            csv_files: self.csv_files.load(Ordering::Relaxed),
            failed_files: self.failed_files.load(Ordering::Relaxed),
            skipped_files: self.skipped_files.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        debug!(
            "Search metrics:\n\
             Files read (buffered/mmap/csv): {}/{}/{}\n\
             Files failed: {}\n\
             Files skipped after cap: {}\n\
             Cache hits/misses: {}/{}",
            stats.buffered_files,
            stats.mmap_files,
            stats.csv_files,
            stats.failed_files,
            stats.skipped_files,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the search counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffered_files: u64,
    pub mmap_files: u64,
    pub csv_files: u64,
    pub failed_files: u64,
    pub skipped_files: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_strategy_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_file_read(ReadStrategy::Buffered);
        metrics.record_file_read(ReadStrategy::Buffered);
        metrics.record_file_read(ReadStrategy::Mapped);
        metrics.record_file_read(ReadStrategy::Csv);

        let stats = metrics.get_stats();
        assert_eq!(stats.buffered_files, 2);
        assert_eq!(stats.mmap_files, 1);
        assert_eq!(stats.csv_files, 1);
    }

    #[test]
    fn test_cache_metrics() {
        let metrics = SearchMetrics::new();

        metrics.record_cache_lookup(false);
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(true);

        assert_eq!(metrics.cache_hits(), 2);
        assert_eq!(metrics.cache_misses(), 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let handle = metrics.clone();

        handle.record_failure();
        handle.record_skipped();

        let stats = metrics.get_stats();
        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.skipped_files, 1);
        assert_eq!(metrics.failed_files(), 1);
    }
}
