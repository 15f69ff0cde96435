use memchr::memchr;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::trace;

use super::decode::{decode_lossy, trim_line_end};
use super::Record;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ReadStrategy;

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;

/// Reads physical lines from a text or SQL file.
///
/// Files strictly larger than the threshold are memory-mapped, everything else goes through a
/// buffered reader. Both produce the same `(line number, text)` pairs: lines split on `\n`,
/// trailing `\r`/`\n` stripped, invalid UTF-8 dropped.
#[derive(Debug)]
pub enum LineRecords {
    Buffered(BufferedLines),
    Mapped(MappedLines),
}

impl LineRecords {
    pub fn open(path: &Path, mmap_threshold_bytes: u64) -> SearchResult<Self> {
        let file = File::open(path).map_err(|e| SearchError::file_access(path, e))?;

        // An unreadable size falls back to the buffered reader
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        if size > mmap_threshold_bytes {
            trace!("Memory mapping {} ({} bytes)", path.display(), size);
            MappedLines::new(path, &file).map(Self::Mapped)
        } else {
            trace!("Buffered read of {} ({} bytes)", path.display(), size);
            Ok(Self::Buffered(BufferedLines::new(path, file)))
        }
    }

    pub fn strategy(&self) -> ReadStrategy {
        match self {
            Self::Buffered(_) => ReadStrategy::Buffered,
            Self::Mapped(_) => ReadStrategy::Mapped,
        }
    }
}

impl Iterator for LineRecords {
    type Item = SearchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Buffered(lines) => lines.next(),
            Self::Mapped(lines) => lines.next(),
        }
    }
}

/// Line reader over a `BufReader`
#[derive(Debug)]
pub struct BufferedLines {
    path: PathBuf,
    reader: BufReader<File>,
    buffer: Vec<u8>,
    line_number: usize,
    done: bool,
}

impl BufferedLines {
    fn new(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(BUFFER_CAPACITY, file),
            buffer: Vec::with_capacity(256),
            line_number: 0,
            done: false,
        }
    }
}

impl Iterator for BufferedLines {
    type Item = SearchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line_number += 1;
                Some(Ok(Record {
                    number: self.line_number,
                    text: decode_lossy(trim_line_end(&self.buffer)).into_owned(),
                }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(SearchError::file_access(&self.path, e)))
            }
        }
    }
}

/// Line reader over a read-only memory map
pub struct MappedLines {
    mmap: Mmap,
    offset: usize,
    line_number: usize,
}

impl MappedLines {
    fn new(path: &Path, file: &File) -> SearchResult<Self> {
        // SAFETY: the map is read-only and dropped with the iterator
        let mmap = unsafe { Mmap::map(file) }.map_err(|e| SearchError::file_access(path, e))?;
        Ok(Self {
            mmap,
            offset: 0,
            line_number: 0,
        })
    }
}

impl std::fmt::Debug for MappedLines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedLines")
            .field("len", &self.mmap.len())
            .field("offset", &self.offset)
            .field("line_number", &self.line_number)
            .finish()
    }
}

impl Iterator for MappedLines {
    type Item = SearchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.mmap.get(self.offset..).filter(|rest| !rest.is_empty())?;
        let end = memchr(b'\n', rest).map_or(rest.len(), |i| i + 1);
        let line = &rest[..end];
        self.offset += end;
        self.line_number += 1;

        Some(Ok(Record {
            number: self.line_number,
            text: decode_lossy(trim_line_end(line)).into_owned(),
        }))
    }
}
