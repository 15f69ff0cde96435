use csv::{ByteRecord, Reader, ReaderBuilder, Terminator};
use memchr::memchr_iter;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::decode::decode_lossy;
use super::Record;
use crate::errors::{SearchError, SearchResult};

const BUFFER_CAPACITY: usize = 65536;

/// Largest field accepted before the file is treated as malformed
pub const MAX_FIELD_BYTES: usize = 128 * 1024;

/// Streams CSV rows, each flattened to its fields joined with `", "`.
///
/// Quoting follows RFC 4180 (double quotes, doubled to escape, fields may span lines). Rows
/// may have differing field counts. The header row is not special: it is row 1.
///
/// Rows are numbered the way a line-oriented CSV reader enumerates them: a blank line is an
/// empty row and uses up a number, a quoted field spanning lines does not.
pub struct CsvRows {
    path: PathBuf,
    reader: Reader<File>,
    record: ByteRecord,
    row_number: usize,
    file_len: u64,
    ends_with_newline: bool,
    done: bool,
}

impl CsvRows {
    pub fn open(path: &Path) -> SearchResult<Self> {
        let mut file = File::open(path).map_err(|e| SearchError::file_access(path, e))?;
        let (file_len, ends_with_newline) =
            read_tail(&mut file).map_err(|e| SearchError::file_access(path, e))?;

        // `\r` is left in the last field and stripped there, so every record consumes its own
        // `\n` and blank lines can be counted from the reader's line position.
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .terminator(Terminator::Any(b'\n'))
            .buffer_capacity(BUFFER_CAPACITY)
            .from_reader(file);

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            record: ByteRecord::new(),
            row_number: 0,
            file_len,
            ends_with_newline,
            done: false,
        })
    }

    fn flatten_row(&self) -> SearchResult<String> {
        let mut row = String::new();
        let last = self.record.len().saturating_sub(1);
        for (i, field) in self.record.iter().enumerate() {
            if field.len() > MAX_FIELD_BYTES {
                let line = self.record.position().map(|p| p.line());
                return Err(SearchError::parsing_error(
                    &self.path,
                    line,
                    format!("field larger than field limit ({})", MAX_FIELD_BYTES),
                ));
            }
            let field = match field {
                [rest @ .., b'\r'] if i == last => rest,
                _ => field,
            };
            if i > 0 {
                row.push_str(", ");
            }
            row.push_str(&decode_lossy(field));
        }
        Ok(row)
    }

    /// Blank lines the reader skipped ahead of the record it just read.
    ///
    /// Every `\n` consumed by one read is either a skipped blank line, a line break inside a
    /// quoted field, or the record's own terminator.
    fn skipped_blank_lines(&self, line_before: u64) -> u64 {
        let position = self.reader.position();
        let consumed = position.line() - line_before;
        let embedded: u64 = self
            .record
            .iter()
            .map(|field| memchr_iter(b'\n', field).count() as u64)
            .sum();
        let terminated = position.byte() < self.file_len || self.ends_with_newline;
        consumed.saturating_sub(embedded + u64::from(terminated))
    }
}

/// File length and whether the last byte is `\n`; the read position is left at the start
fn read_tail(file: &mut File) -> std::io::Result<(u64, bool)> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok((0, false));
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    file.rewind()?;
    Ok((len, last[0] == b'\n'))
}

fn csv_error(path: &Path, err: csv::Error) -> SearchError {
    let line = err.position().map(|p| p.line());
    let details = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => SearchError::file_access(path, source),
        _ => SearchError::parsing_error(path, line, details),
    }
}

impl Iterator for CsvRows {
    type Item = SearchResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let line_before = self.reader.position().line();
        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {
                let blanks = self.skipped_blank_lines(line_before) as usize;
                self.row_number += blanks + 1;
                let text = match self.flatten_row() {
                    Ok(text) => text,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                };
                Some(Ok(Record {
                    number: self.row_number,
                    text,
                }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(csv_error(&self.path, e)))
            }
        }
    }
}

impl std::fmt::Debug for CsvRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRows")
            .field("path", &self.path)
            .field("row_number", &self.row_number)
            .field("done", &self.done)
            .finish()
    }
}
