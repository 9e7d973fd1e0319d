use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::cache::TableCache;
use crate::config::{NUM_LEVELS, Options};
use crate::error::{Error, Result};
use crate::filename::{
    FileType, db_dir, descriptor_file_name, log_file_name, parse_file_name, table_file_name,
    temp_file_name,
};
use crate::manifest;
use crate::memtable::MemTable;
use crate::types::{LookupResult, ValueType};
use crate::version::Version;
use crate::wal::{WALManager, WALReader, WALRecord};

/// Point-in-time counters, as returned by `DB::stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub level_files: [usize; NUM_LEVELS],
    pub level_bytes: [u64; NUM_LEVELS],
    pub last_sequence: u64,
    pub memtable_usage: usize,
    pub immutable_pending: bool,
    pub compaction_scheduled: bool,
}

/// An embedded LSM key-value store.
///
/// All methods take `&self`; share a `DB` between threads with an `Arc`
/// or scoped threads. Dropping the handle closes the database.
pub struct DB {
    inner: Arc<DbInner>,
}

struct DbInner {
    name: PathBuf,
    options: Arc<Options>,
    table_cache: Arc<TableCache>,
    state: Mutex<DbState>,
    /// Signalled whenever a background pass ends.
    background_done: Condvar,
}

struct DbState {
    mem: Arc<MemTable>,
    /// Memtable being flushed, if any, with the log that backs it.
    imm: Option<(Arc<MemTable>, u64)>,
    current: Arc<Version>,
    last_sequence: u64,
    compaction_scheduled: bool,
    /// Error of the last background pass, cleared by the next one that
    /// succeeds.
    bg_error: Option<Error>,
    closed: bool,
    /// `None` once closed.
    wal: Option<WALManager>,
    manifest_number: u64,
    /// Versions replaced by a newer one but possibly still held by readers.
    retired: Vec<Arc<Version>>,
    /// Tables dropped from the catalog and waiting for their last reader.
    obsolete_tables: BTreeSet<u64>,
}

impl DB {
    /// Open (or create) the database named `name` with default options.
    ///
    /// The name is a path prefix: `data/ASUKA` keeps its files in `data/`.
    pub fn open<P: AsRef<Path>>(name: P) -> Result<DB> {
        Self::open_with_options(name, Options::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(name: P, options: Options) -> Result<DB> {
        let name = name.as_ref().to_path_buf();
        fs::create_dir_all(db_dir(&name))?;

        let options = Arc::new(options);
        let table_cache = Arc::new(TableCache::new(&name, options.table_cache_capacity()));
        let existing = list_files(&name)?;

        let recovered = manifest::read_current_file(&name)?;
        let mut version = match recovered {
            Some(number) => Version::load(Arc::clone(&table_cache), Arc::clone(&options), number)?,
            None => Version::new(Arc::clone(&table_cache), Arc::clone(&options)),
        };

        // Replay every log in creation order into one memtable.
        let mut logs: Vec<u64> = existing
            .iter()
            .filter_map(|t| match t {
                FileType::Log(n) => Some(*n),
                _ => None,
            })
            .collect();
        logs.sort_unstable();

        let mem = MemTable::new();
        let mut last_sequence = version.last_sequence();
        for &number in &logs {
            let reader = WALReader::new(&log_file_name(&name, number))?;
            let mut replayed = 0usize;
            for record in reader.iter() {
                mem.add(record.sequence, record.value_type, &record.key, &record.value);
                last_sequence = last_sequence.max(record.sequence);
                replayed += 1;
            }
            debug!("replayed {replayed} records from log #{number}");
        }
        version.set_last_sequence(last_sequence);

        let manifest_number = match recovered {
            Some(number) if mem.is_empty() => number,
            _ => {
                if !mem.is_empty() {
                    info!("recovered {} entries from {} logs", mem.len(), logs.len());
                }
                version.write_level0_table(&mem)?;
                let number = version.save()?;
                manifest::set_current_file(&name, number)?;
                number
            }
        };
        // Everything replayed is now in a table named by CURRENT.
        for &number in &logs {
            remove_file_logged(&log_file_name(&name, number));
        }

        let log_number = logs.last().map_or(1, |n| n + 1);
        let wal = WALManager::new(&name, log_number, options.sync_policy)?;

        let live: HashSet<u64> = version.live_files().into_iter().collect();
        for file in &existing {
            let stray = match *file {
                FileType::Table(n) if !live.contains(&n) => table_file_name(&name, n),
                FileType::Temp(n) => temp_file_name(&name, n),
                FileType::Descriptor(n) if n != manifest_number => descriptor_file_name(&name, n),
                _ => continue,
            };
            info!("removing stray file {}", stray.display());
            remove_file_logged(&stray);
        }

        info!(
            "opened {} at sequence {last_sequence} with manifest #{manifest_number}",
            name.display()
        );

        let inner = Arc::new(DbInner {
            name,
            options,
            table_cache,
            state: Mutex::new(DbState {
                mem: Arc::new(MemTable::new()),
                imm: None,
                current: Arc::new(version),
                last_sequence,
                compaction_scheduled: false,
                bg_error: None,
                closed: false,
                wal: Some(wal),
                manifest_number,
                retired: Vec::new(),
                obsolete_tables: BTreeSet::new(),
            }),
            background_done: Condvar::new(),
        });
        {
            let mut state = inner.state.lock();
            inner.maybe_schedule_compaction(&mut state);
        }
        Ok(DB { inner })
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write(ValueType::Value, key, value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.write(ValueType::Deletion, key, &[])
    }

    /// Look up `key` as of the moment of the call.
    ///
    /// `LookupResult::Deletion` means the newest write for the key was a
    /// delete.
    pub fn get(&self, key: &[u8]) -> Result<LookupResult> {
        let (mem, imm, current, snapshot) = {
            let state = self.inner.state.lock();
            if state.closed {
                return Err(Error::Closed);
            }
            (
                Arc::clone(&state.mem),
                state.imm.as_ref().map(|(imm, _)| Arc::clone(imm)),
                Arc::clone(&state.current),
                state.last_sequence,
            )
        };

        // search from memtable first
        let result = mem.get_at(key, snapshot);
        if result.is_resolved() {
            return Ok(result);
        }
        // then search from immutable memtable
        if let Some(imm) = imm {
            let result = imm.get_at(key, snapshot);
            if result.is_resolved() {
                return Ok(result);
            }
        }
        // finally search the tables
        current.get(key)
    }

    /// Block until no background pass is scheduled or running.
    pub fn wait_for_background_work(&self) {
        let mut state = self.inner.state.lock();
        while state.compaction_scheduled {
            self.inner.background_done.wait(&mut state);
        }
    }

    pub fn stats(&self) -> Stats {
        let state = self.inner.state.lock();
        let mut level_files = [0; NUM_LEVELS];
        let mut level_bytes = [0; NUM_LEVELS];
        for level in 0..NUM_LEVELS {
            level_files[level] = state.current.num_level_files(level);
            level_bytes[level] = state.current.level_bytes(level);
        }
        Stats {
            level_files,
            level_bytes,
            last_sequence: state.last_sequence,
            memtable_usage: state.mem.approximate_memory_usage(),
            immutable_pending: state.imm.is_some(),
            compaction_scheduled: state.compaction_scheduled,
        }
    }

    /// Stop accepting work, wait for the background pass, sync the log.
    ///
    /// Unflushed writes stay in the log and are replayed on the next open.
    /// Calling `close` again is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        while state.compaction_scheduled {
            self.inner.background_done.wait(&mut state);
        }
        if let Some(mut wal) = state.wal.take() {
            wal.sync()?;
        }
        self.inner.collect_obsolete(&mut state);
        // Writers parked on a full memtable see `closed` and give up.
        self.inner.background_done.notify_all();
        info!("closed {}", self.inner.name.display());
        Ok(())
    }
}

impl Drop for DB {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("closing {} failed: {e}", self.inner.name.display());
        }
    }
}

impl DbInner {
    fn write(self: &Arc<Self>, value_type: ValueType, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        self.make_room_for_write(&mut state)?;

        // Sequence, log and memtable move together under the lock, so
        // commit order is sequence order.
        let sequence = state.last_sequence + 1;
        let record = match value_type {
            ValueType::Value => WALRecord::put(sequence, key, value),
            ValueType::Deletion => WALRecord::delete(sequence, key),
        };
        state.wal.as_mut().ok_or(Error::Closed)?.append(&record)?;
        state.mem.add(sequence, value_type, key, value);
        state.last_sequence = sequence;
        Ok(())
    }

    fn make_room_for_write(self: &Arc<Self>, state: &mut MutexGuard<'_, DbState>) -> Result<()> {
        // Set once this write has scheduled a retry after a failed pass.
        let mut retried = false;
        loop {
            if state.closed {
                return Err(Error::Closed);
            }
            // A level 0 that nothing is going to shrink does not hold
            // writes back.
            let slowdown = state.current.num_level_files(0)
                >= self.options.l0_slowdown_writes_trigger
                && self.expect_background_progress(state, &mut retried)?;
            if slowdown {
                // We are getting close to the point where level 0 gets too
                // slow to read. Sleep 1ms with the lock released, which
                // hands some CPU to the compaction thread, and check again.
                MutexGuard::unlocked(state, || thread::sleep(Duration::from_millis(1)));
            } else if state.mem.approximate_memory_usage() <= self.options.write_buffer_size {
                // There is room in current memtable
                return Ok(());
            } else if state.imm.is_some() {
                // We have filled up the current memtable, but the previous
                // one is still being flushed, so we wait.
                if !self.expect_background_progress(state, &mut retried)? {
                    return Err(Error::Io(io::Error::other(
                        "no background thread to flush the immutable memtable",
                    )));
                }
                self.background_done.wait(state);
            } else {
                // Switch to a new memtable and log, and flush the old one
                let wal = state.wal.as_mut().ok_or(Error::Closed)?;
                let sealed_log = wal.rotate()?;
                let full = std::mem::replace(&mut state.mem, Arc::new(MemTable::new()));
                debug!(
                    "rotated memtable ({} bytes) backed by log #{sealed_log}",
                    full.approximate_memory_usage()
                );
                state.imm = Some((full, sealed_log));
                self.maybe_schedule_compaction(state);
            }
        }
    }

    /// Make sure a background pass is on its way for a stalled writer.
    /// Returns whether one is scheduled or running.
    ///
    /// After a failed pass each write schedules one retry. When that retry
    /// fails as well, its error is returned to the writer.
    fn expect_background_progress(
        self: &Arc<Self>,
        state: &mut DbState,
        retried: &mut bool,
    ) -> Result<bool> {
        if state.compaction_scheduled {
            return Ok(true);
        }
        if let Some(e) = &state.bg_error {
            if *retried {
                return Err(e.clone());
            }
            *retried = true;
        }
        self.maybe_schedule_compaction(state);
        Ok(state.compaction_scheduled)
    }

    fn maybe_schedule_compaction(self: &Arc<Self>, state: &mut DbState) {
        if state.compaction_scheduled || state.closed {
            return;
        }
        if state.imm.is_none() && !state.current.needs_compaction() {
            return;
        }
        state.compaction_scheduled = true;

        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("lsmkv-compaction".into())
            .spawn(move || inner.background_call());
        if let Err(e) = spawned {
            error!("failed to spawn compaction thread: {e}");
            state.compaction_scheduled = false;
        }
    }

    fn background_call(self: &Arc<Self>) {
        let mut state = self.state.lock();
        let succeeded = match self.background_compaction(&mut state) {
            Ok(()) => {
                state.bg_error = None;
                true
            }
            Err(e) => {
                error!("background compaction failed: {e}");
                state.bg_error = Some(e);
                false
            }
        };
        state.compaction_scheduled = false;
        if succeeded {
            // The pass may have left another memtable or an unbalanced
            // level behind.
            self.maybe_schedule_compaction(&mut state);
        }
        self.background_done.notify_all();
    }

    /// One background pass: flush, compact, persist, publish.
    fn background_compaction(&self, state: &mut MutexGuard<'_, DbState>) -> Result<()> {
        let imm = state.imm.clone();
        let mut base = (*state.current).clone();
        base.set_last_sequence(state.last_sequence);
        let old_manifest = state.manifest_number;

        // Release mutex while we're actually doing the work
        let new_manifest = MutexGuard::unlocked(state, || -> Result<Option<u64>> {
            let mut changed = false;
            if let Some((mem, _)) = &imm {
                changed |= base.write_level0_table(mem)?.is_some();
            }
            while base.do_compaction_work()? {
                base.log();
                changed = true;
            }
            if !changed && imm.is_none() {
                return Ok(None);
            }
            let number = base.save()?;
            manifest::set_current_file(&self.name, number)?;
            Ok(Some(number))
        })?;

        if let Some(number) = new_manifest {
            let old = std::mem::replace(&mut state.current, Arc::new(base));
            let live: HashSet<u64> = state.current.live_files().into_iter().collect();
            let dropped: Vec<u64> = old
                .live_files()
                .into_iter()
                .filter(|n| !live.contains(n))
                .collect();
            state.obsolete_tables.extend(dropped);
            state.retired.push(old);
            state.manifest_number = number;
            if old_manifest != 0 && old_manifest != number {
                remove_file_logged(&descriptor_file_name(&self.name, old_manifest));
            }
        }

        if let Some((flushed, log_number)) = imm {
            let still_pending = state
                .imm
                .as_ref()
                .is_some_and(|(pending, _)| Arc::ptr_eq(pending, &flushed));
            if still_pending {
                state.imm = None;
                remove_file_logged(&log_file_name(&self.name, log_number));
            }
        }

        self.collect_obsolete(state);
        Ok(())
    }

    /// Delete dropped tables that no live version references any more.
    fn collect_obsolete(&self, state: &mut DbState) {
        state.retired.retain(|v| Arc::strong_count(v) > 1);
        if state.obsolete_tables.is_empty() {
            return;
        }

        let mut referenced: HashSet<u64> = state.current.live_files().into_iter().collect();
        for version in &state.retired {
            referenced.extend(version.live_files());
        }

        let (in_use, deletable): (BTreeSet<u64>, BTreeSet<u64>) =
            std::mem::take(&mut state.obsolete_tables)
                .into_iter()
                .partition(|n| referenced.contains(n));
        for number in deletable {
            self.table_cache.evict(number);
            debug!("deleting obsolete table #{number}");
            remove_file_logged(&table_file_name(&self.name, number));
        }
        state.obsolete_tables = in_use;
    }
}

/// Every engine-owned file currently in the database directory.
fn list_files(name: &Path) -> Result<Vec<FileType>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(db_dir(name))? {
        let entry = entry?;
        if let Some(file_type) = entry
            .file_name()
            .to_str()
            .and_then(|file_name| parse_file_name(name, file_name))
        {
            files.push(file_type);
        }
    }
    Ok(files)
}

fn remove_file_logged(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove {}: {e}", path.display()),
    }
}
