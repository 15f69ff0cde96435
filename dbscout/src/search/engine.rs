use dashmap::DashMap;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::matcher::QueryMatcher;
use super::processor::FileProcessor;
use crate::config::SearchConfig;
use crate::directory::{DirectoryProvider, FsDirectory};
use crate::errors::{SearchError, SearchResult};
use crate::index::FileIndex;
use crate::metrics::SearchMetrics;
use crate::results::{FileDescriptor, SearchMatch, SearchOutput, SearchStats};

/// Coordinates searches over the indexed files of one root directory.
///
/// The engine owns its file index, its result cache and its metrics; two engines never share
/// state. Answers are memoized per trimmed query for the engine's lifetime, or until
/// [`SearchEngine::clear_cache`].
#[derive(Debug)]
pub struct SearchEngine {
    config: SearchConfig,
    index: FileIndex,
    cache: DashMap<String, Arc<[SearchMatch]>>,
    metrics: SearchMetrics,
}

impl SearchEngine {
    /// Creates an engine over the real filesystem at `config.root_directory`
    pub fn new(config: SearchConfig) -> Self {
        let provider = FsDirectory::new(config.root_directory.clone());
        Self::with_provider(config, Box::new(provider))
    }

    /// Creates an engine whose index lists files through `provider`
    pub fn with_provider(config: SearchConfig, provider: Box<dyn DirectoryProvider>) -> Self {
        let index = FileIndex::new(provider, &config);
        Self {
            config,
            index,
            cache: DashMap::new(),
            metrics: SearchMetrics::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Searches every indexed file in index order, one file at a time.
    ///
    /// Stops reading as soon as `max_results` matches are collected.
    pub fn search(&self, query: &str) -> SearchResult<SearchOutput> {
        let start = Instant::now();
        let query = validate_query(query)?;
        if let Some(output) = self.cached(query, start)? {
            return Ok(output);
        }

        let files = self.index.get_files()?;
        info!(
            "Starting sequential search for {:?} across {} files",
            query,
            files.len()
        );

        let processor = self.processor(query);
        let cap = self.config.max_results.get();
        let stop = AtomicBool::new(false);
        let mut matches = Vec::new();

        for file in &files {
            let found = self.search_isolated(&processor, file, cap - matches.len(), &stop);
            matches.extend(found);
            if matches.len() >= cap {
                matches.truncate(cap);
                debug!("Result cap of {} reached", cap);
                break;
            }
        }

        Ok(self.finish(query, matches, files.len(), start))
    }

    /// Searches the indexed files concurrently on `parallel_workers` threads
    pub fn search_parallel(&self, query: &str) -> SearchResult<SearchOutput> {
        self.search_parallel_with(query, None)
    }

    /// Searches the indexed files concurrently, overriding the worker count for this call.
    ///
    /// Matches from one file stay in file order; files appear in completion order. Once
    /// `max_results` matches are collected, files not yet started are skipped and results that
    /// arrive afterwards are discarded.
    pub fn search_parallel_with(
        &self,
        query: &str,
        workers: Option<NonZeroUsize>,
    ) -> SearchResult<SearchOutput> {
        let start = Instant::now();
        let query = validate_query(query)?;
        if let Some(output) = self.cached(query, start)? {
            return Ok(output);
        }

        let files = self.index.get_files()?;
        let workers = workers.unwrap_or(self.config.parallel_workers);
        info!(
            "Starting parallel search for {:?} across {} files on {} workers",
            query,
            files.len(),
            workers
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.get())
            .thread_name(|i| format!("dbscout-search-{}", i))
            .build()?;

        let processor = self.processor(query);
        let cap = self.config.max_results.get();
        let stop = AtomicBool::new(false);
        let accumulator = Mutex::new(Vec::new());

        pool.install(|| {
            files.par_iter().for_each(|file| {
                if stop.load(Ordering::Relaxed) {
                    self.metrics.record_skipped();
                    return;
                }

                let found = self.search_isolated(&processor, file, cap, &stop);
                if found.is_empty() {
                    return;
                }

                let mut acc = accumulator.lock().unwrap_or_else(|e| e.into_inner());
                if stop.load(Ordering::Relaxed) {
                    debug!("Discarding late results from {}", file.name);
                    return;
                }
                acc.extend(found);
                if acc.len() >= cap {
                    acc.truncate(cap);
                    stop.store(true, Ordering::Relaxed);
                    debug!("Result cap of {} reached", cap);
                }
            });
        });

        let matches = accumulator.into_inner().unwrap_or_else(|e| e.into_inner());
        Ok(self.finish(query, matches, files.len(), start))
    }

    /// Empties the result cache and marks the index stale
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.index.invalidate();
        debug!("Result cache cleared and file index invalidated");
    }

    /// Number of indexed files and their total size in bytes
    pub fn file_stats(&self) -> SearchResult<(usize, u64)> {
        Ok((self.index.count()?, self.index.total_size()?))
    }

    /// Queries with a memoized answer, sorted
    pub fn cached_queries(&self) -> Vec<String> {
        let mut queries: Vec<String> = self.cache.iter().map(|e| e.key().clone()).collect();
        queries.sort();
        queries
    }

    fn processor(&self, query: &str) -> FileProcessor {
        FileProcessor::new(
            QueryMatcher::new(query, self.config.case_sensitive),
            self.metrics.clone(),
            self.config.mmap_threshold_bytes,
        )
    }

    fn cached(&self, query: &str, start: Instant) -> SearchResult<Option<SearchOutput>> {
        let hit = self.cache.get(query).map(|entry| entry.value().clone());
        self.metrics.record_cache_lookup(hit.is_some());

        let Some(matches) = hit else {
            return Ok(None);
        };
        debug!("Cache hit for {:?}", query);
        let stats = SearchStats {
            files_searched: self.index.count()?,
            total_matches: matches.len(),
            duration_seconds: start.elapsed().as_secs_f64(),
        };
        Ok(Some(SearchOutput { matches, stats }))
    }

    /// Runs one file, turning every failure into an empty contribution
    fn search_isolated(
        &self,
        processor: &FileProcessor,
        file: &FileDescriptor,
        limit: usize,
        stop: &AtomicBool,
    ) -> Vec<SearchMatch> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            processor.process_file(file, limit, stop)
        }));

        match outcome {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                self.metrics.record_failure();
                if e.is_file_level() {
                    warn!(file = %file.name, error = %e, "Skipping file");
                } else {
                    error!(file = %file.name, error = %e, "Unexpected error while searching file");
                }
                Vec::new()
            }
            Err(payload) => {
                self.metrics.record_failure();
                error!(
                    file = %file.name,
                    error = %panic_message(payload.as_ref()),
                    "Panic while searching file"
                );
                Vec::new()
            }
        }
    }

    fn finish(
        &self,
        query: &str,
        matches: Vec<SearchMatch>,
        files_searched: usize,
        start: Instant,
    ) -> SearchOutput {
        let matches: Arc<[SearchMatch]> = matches.into();
        // A concurrent call for the same query may have stored first; its answer wins
        let matches = self
            .cache
            .entry(query.to_string())
            .or_insert(matches)
            .value()
            .clone();

        let stats = SearchStats {
            files_searched,
            total_matches: matches.len(),
            duration_seconds: start.elapsed().as_secs_f64(),
        };
        info!(
            "Search complete. Found {} matches in {} files ({:.3}s)",
            stats.total_matches, stats.files_searched, stats.duration_seconds
        );
        self.metrics.log_stats();

        SearchOutput { matches, stats }
    }
}

fn validate_query(query: &str) -> SearchResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SearchError::invalid_query("Search query cannot be empty"));
    }
    Ok(query)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
