//! In-memory catalog of the searchable files in the root directory.
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, trace};

use crate::config::SearchConfig;
use crate::directory::DirectoryProvider;
use crate::errors::{SearchError, SearchResult};
use crate::results::{FileDescriptor, FileFormat};

#[derive(Debug, Default)]
struct IndexState {
    files: Vec<FileDescriptor>,
    by_name: HashMap<String, usize>,
    stale: bool,
}

impl IndexState {
    fn stale() -> Self {
        Self {
            stale: true,
            ..Self::default()
        }
    }
}

/// Maps file names to descriptors for the immediate files of the root directory.
///
/// The index starts stale and scans the directory on first access. [`FileIndex::invalidate`]
/// marks it stale again; the next read rescans in full. A refresh assembles the new entry set
/// off to the side and swaps it in under the write lock, so readers see either the previous
/// scan or the new one.
pub struct FileIndex {
    provider: Box<dyn DirectoryProvider>,
    config: SearchConfig,
    state: RwLock<IndexState>,
}

impl FileIndex {
    pub fn new(provider: Box<dyn DirectoryProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            config: config.clone(),
            state: RwLock::new(IndexState::stale()),
        }
    }

    /// Rescans the root directory and returns the number of indexed files.
    ///
    /// A missing root yields an empty index. A root that is not a directory, or whose listing
    /// fails, is an error and leaves the previous entries in place.
    pub fn refresh(&self) -> SearchResult<usize> {
        let root = self.provider.root();

        if !self.provider.exists() {
            debug!("Root directory {} does not exist", root.display());
            self.publish(Vec::new());
            return Ok(0);
        }

        if !self.provider.is_directory() {
            return Err(SearchError::config_error(format!(
                "Base path is not a directory: {}",
                root.display()
            )));
        }

        let entries = self
            .provider
            .entries()
            .map_err(|e| SearchError::file_access(&root, e))?;

        let mut files = Vec::with_capacity(entries.len());
        for entry in entries.into_iter().filter(|entry| entry.is_file) {
            let Some(ext) = entry.path.extension().and_then(|ext| ext.to_str()) else {
                continue;
            };
            if !self.config.recognizes(ext) {
                continue;
            }
            let Some(format) = FileFormat::from_extension(ext) else {
                debug!("No parser for recognized extension: {}", entry.path.display());
                continue;
            };
            let Some(name) = entry.path.file_name() else {
                continue;
            };
            let name = name.to_string_lossy();

            match self.provider.stat_size(&entry.path) {
                Ok(size_bytes) => files.push(FileDescriptor {
                    name: name.to_string(),
                    path: entry.path.clone(),
                    size_bytes,
                    format,
                }),
                Err(e) => trace!("Skipping {}: {}", entry.path.display(), e),
            }
        }

        // Listing order is platform dependent; name order keeps searches reproducible
        files.sort_by(|a, b| a.name.cmp(&b.name));
        let count = self.publish(files);
        debug!("Indexed {} files under {}", count, root.display());
        Ok(count)
    }

    fn publish(&self, files: Vec<FileDescriptor>) -> usize {
        let mut by_name = HashMap::with_capacity(files.len());
        let mut unique: Vec<FileDescriptor> = Vec::with_capacity(files.len());
        for file in files {
            if let Some(&slot) = by_name.get(&file.name) {
                unique[slot] = file;
            } else {
                by_name.insert(file.name.clone(), unique.len());
                unique.push(file);
            }
        }

        let count = unique.len();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = IndexState {
            files: unique,
            by_name,
            stale: false,
        };
        count
    }

    fn ensure_fresh(&self) -> SearchResult<()> {
        let stale = self.state.read().unwrap_or_else(|e| e.into_inner()).stale;
        if stale {
            self.refresh()?;
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&IndexState) -> T) -> SearchResult<T> {
        self.ensure_fresh()?;
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(f(&state))
    }

    /// All indexed files in index order
    pub fn get_files(&self) -> SearchResult<Vec<FileDescriptor>> {
        self.read(|state| state.files.clone())
    }

    /// Looks up a file by name
    pub fn get(&self, name: &str) -> SearchResult<Option<FileDescriptor>> {
        self.read(|state| {
            state
                .by_name
                .get(name)
                .map(|&slot| state.files[slot].clone())
        })
    }

    /// Total size in bytes of all indexed files
    pub fn total_size(&self) -> SearchResult<u64> {
        self.read(|state| state.files.iter().map(|f| f.size_bytes).sum())
    }

    /// Number of indexed files
    pub fn count(&self) -> SearchResult<usize> {
        self.read(|state| state.files.len())
    }

    /// Marks the index stale; the next access rescans the directory
    pub fn invalidate(&self) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).stale
    }
}

impl std::fmt::Debug for FileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIndex")
            .field("root", &self.provider.root())
            .field("extensions", &self.config.recognized_extensions)
            .field("stale", &self.is_stale())
            .finish()
    }
}
