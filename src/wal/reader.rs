use std::fs;
use std::path::Path;

use log::warn;

use crate::error::Result;
use crate::wal::record::WALRecord;

/// Reads WAL records from a file for crash recovery.
///
/// Loads the entire file into memory, then iterates record by record.
/// On startup:
/// 1. Find all WAL files
/// 2. Replay each record into a fresh memtable
/// 3. If CRC fails on a record, stop: it was a partial write from a crash.
///    All preceding records are valid.
pub struct WALReader {
    data: Vec<u8>,
    name: String,
}

impl WALReader {
    /// Open a WAL file for reading.
    pub fn new(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(WALReader {
            data,
            name: path.display().to_string(),
        })
    }

    /// Create an iterator over all valid records in the WAL.
    pub fn iter(&self) -> WALIterator<'_> {
        WALIterator {
            reader: self,
            offset: 0,
        }
    }
}

/// Iterator over WAL records. Yields records until EOF or corruption.
///
/// On a bad record (CRC mismatch or truncation) the rest of the file is
/// ignored with a warning. WAL writes are sequential and append-only, so a
/// damaged record marks where the crash happened.
pub struct WALIterator<'a> {
    reader: &'a WALReader,
    offset: usize,
}

impl Iterator for WALIterator<'_> {
    type Item = WALRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let data = &self.reader.data;
        if self.offset >= data.len() {
            return None;
        }

        match WALRecord::decode(&data[self.offset..]) {
            Ok((record, consumed)) => {
                self.offset += consumed;
                Some(record)
            }
            Err(e) => {
                warn!(
                    "{}: ignoring {} bytes after offset {}: {e}",
                    self.reader.name,
                    data.len() - self.offset,
                    self.offset
                );
                // Stay exhausted.
                self.offset = data.len();
                None
            }
        }
    }
}
