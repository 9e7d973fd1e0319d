use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::Result;
use crate::filename::log_file_name;
use crate::wal::SyncPolicy;
use crate::wal::record::WALRecord;

/// Writes WAL records to a file on disk.
///
/// The WAL ensures crash recovery: on restart, replay the WAL to
/// reconstruct the memtable.
///
/// Two layers of buffering:
///   BufWriter.flush()  → Rust buffer → OS page cache
///   file.sync_all()    → OS page cache → physical disk
pub struct WALWriter {
    writer: BufWriter<File>,
    offset: u64,
    sync_policy: SyncPolicy,
    writes_since_sync: usize,
    last_sync: Instant,
}

impl WALWriter {
    /// Create a new WAL writer at the given path, appending to any
    /// existing content.
    pub fn new(path: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let offset = file.metadata()?.len();

        Ok(WALWriter {
            writer: BufWriter::new(file),
            offset,
            sync_policy,
            writes_since_sync: 0,
            last_sync: Instant::now(),
        })
    }

    /// Append a record to the WAL.
    /// Depending on SyncPolicy, may fsync after this write.
    pub fn append(&mut self, record: &WALRecord) -> Result<()> {
        let encoded = record.encode();

        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        self.offset += encoded.len() as u64;
        self.writes_since_sync += 1;

        let due = match self.sync_policy {
            SyncPolicy::EveryWrite => true,
            SyncPolicy::EveryNWrites(n) => self.writes_since_sync >= n,
            SyncPolicy::EveryNMillis(ms) => self.last_sync.elapsed() >= Duration::from_millis(ms),
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Force fsync to disk. Ensures all buffered writes are durable.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_sync = 0;
        self.last_sync = Instant::now();
        Ok(())
    }

    /// Current file offset (bytes written so far).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Records appended since the last fsync.
    pub fn writes_since_sync(&self) -> usize {
        self.writes_since_sync
    }
}

/// Manages WAL file rotation.
///
/// When the memtable is rotated:
/// 1. Create a new WAL for the new active memtable
/// 2. Keep the old WAL until its memtable's table is written and fsync'd
/// 3. Delete the old WAL
///
/// CRITICAL INVARIANT: an old WAL is only deleted AFTER its table is fully
/// written and fsync'd and the manifest naming that table is current.
/// Violating this loses data.
pub struct WALManager {
    db_name: PathBuf,
    active: WALWriter,
    active_number: u64,
    sync_policy: SyncPolicy,
}

impl WALManager {
    /// Start a fresh log numbered `number`.
    pub fn new(db_name: &Path, number: u64, sync_policy: SyncPolicy) -> Result<Self> {
        let active = WALWriter::new(&log_file_name(db_name, number), sync_policy)?;
        debug!("opened log #{number}");
        Ok(WALManager {
            db_name: db_name.to_path_buf(),
            active,
            active_number: number,
            sync_policy,
        })
    }

    pub fn append(&mut self, record: &WALRecord) -> Result<()> {
        self.active.append(record)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.active.sync()
    }

    /// Number of the log currently receiving writes.
    pub fn current_number(&self) -> u64 {
        self.active_number
    }

    /// Rotate: seal the current log and start the next one.
    /// Returns the number of the sealed log (caller deletes it after the
    /// memtable it backs is flushed).
    pub fn rotate(&mut self) -> Result<u64> {
        self.active.sync()?;
        let next = self.active_number + 1;
        self.active = WALWriter::new(&log_file_name(&self.db_name, next), self.sync_policy)?;
        let sealed = std::mem::replace(&mut self.active_number, next);
        debug!("rotated log #{sealed} -> #{next}");
        Ok(sealed)
    }
}
