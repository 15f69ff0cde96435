use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One immediate entry of the root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub is_file: bool,
}

/// Access to the directory holding the database files.
///
/// The index only ever lists the root non-recursively and stats the files it keeps, so this is
/// the whole surface the core needs from the filesystem at index time. Creating the directory
/// is left to the application's startup code.
#[cfg_attr(test, mockall::automock)]
pub trait DirectoryProvider: Send + Sync {
    /// The root directory path
    fn root(&self) -> PathBuf;

    fn exists(&self) -> bool;

    fn is_directory(&self) -> bool;

    /// Lists the immediate entries of the root
    fn entries(&self) -> io::Result<Vec<DirectoryEntry>>;

    /// Size in bytes of a listed file
    fn stat_size(&self, path: &Path) -> io::Result<u64>;
}

/// The real filesystem
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DirectoryProvider for FsDirectory {
    fn root(&self) -> PathBuf {
        self.root.clone()
    }

    fn exists(&self) -> bool {
        self.root.exists()
    }

    fn is_directory(&self) -> bool {
        self.root.is_dir()
    }

    fn entries(&self) -> io::Result<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            // Follows symlinks, so a link to a regular file counts as a file
            let is_file = path.is_file();
            entries.push(DirectoryEntry { path, is_file });
        }
        Ok(entries)
    }

    fn stat_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
}
