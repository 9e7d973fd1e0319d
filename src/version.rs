use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::cache::TableCache;
use crate::compaction::Compaction;
use crate::config::{ALLOWED_SEEKS, MAX_MEM_COMPACT_LEVEL, NUM_LEVELS, Options, max_bytes_for_level};
use crate::error::{Error, Result};
use crate::filename::table_file_name;
use crate::iterator::{MergingIterator, StorageIterator};
use crate::manifest;
use crate::memtable::{MemTable, MemTableIterator};
use crate::sstable::TableBuilder;
use crate::types::{InternalKey, LookupResult, read_u32, read_u64, user_key_compare};

/// Catalog entry for one table file. Never changes once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetaData {
    /// Persisted, not consulted by the compaction policy.
    pub allowed_seeks: u64,
    pub file_size: u64,
    pub number: u64,
    /// Smallest internal key served by the table (value stripped).
    pub smallest: InternalKey,
    /// Largest internal key served by the table (value stripped).
    pub largest: InternalKey,
}

impl FileMetaData {
    /// `allowed_seeks | file_size | number | smallest | largest`
    pub fn encode_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.allowed_seeks.to_le_bytes())?;
        w.write_all(&self.file_size.to_le_bytes())?;
        w.write_all(&self.number.to_le_bytes())?;
        self.smallest.encode_to(w)?;
        self.largest.encode_to(w)
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let allowed_seeks = read_u64(r)?;
        let file_size = read_u64(r)?;
        let number = read_u64(r)?;
        let smallest = InternalKey::decode_from(r)?;
        let largest = InternalKey::decode_from(r)?;
        Ok(FileMetaData {
            allowed_seeks,
            file_size,
            number,
            smallest,
            largest,
        })
    }

    fn contains_user_key(&self, user_key: &[u8]) -> bool {
        self.smallest.user_key.as_slice() <= user_key
            && user_key <= self.largest.user_key.as_slice()
    }
}

/// A table being written: flush output or one compaction output.
struct PendingTable {
    number: u64,
    builder: TableBuilder,
    smallest: InternalKey,
    largest: InternalKey,
}

impl PendingTable {
    fn create(db_name: &Path, number: u64, options: &Options, first: &InternalKey) -> Result<Self> {
        Ok(PendingTable {
            number,
            builder: TableBuilder::new(&table_file_name(db_name, number), options)?,
            smallest: first.without_value(),
            largest: first.without_value(),
        })
    }

    fn add(&mut self, key: &InternalKey) -> Result<()> {
        self.builder.add(key)?;
        self.largest = key.without_value();
        Ok(())
    }

    fn finish(self) -> Result<Arc<FileMetaData>> {
        let file_size = self.builder.finish()?;
        Ok(Arc::new(FileMetaData {
            allowed_seeks: ALLOWED_SEEKS,
            file_size,
            number: self.number,
            smallest: self.smallest,
            largest: self.largest,
        }))
    }
}

/// The leveled file catalog.
///
/// Level 0 holds flushed memtables in arrival order and its files may
/// overlap. Every deeper level is sorted by smallest key and its files
/// cover disjoint user-key ranges.
///
/// A published version is never modified: background work clones it,
/// mutates the clone, and the engine swaps the `Arc`.
#[derive(Clone)]
pub struct Version {
    table_cache: Arc<TableCache>,
    options: Arc<Options>,
    next_file_number: u64,
    seq: u64,
    files: [Vec<Arc<FileMetaData>>; NUM_LEVELS],
    /// Per-level key at which the next compaction at that level should
    /// start. Kept in memory only.
    compact_pointer: [Option<InternalKey>; NUM_LEVELS],
}

impl Version {
    pub fn new(table_cache: Arc<TableCache>, options: Arc<Options>) -> Self {
        Version {
            table_cache,
            options,
            next_file_number: 1,
            seq: 0,
            files: Default::default(),
            compact_pointer: Default::default(),
        }
    }

    /// Load the catalog saved in descriptor `number`.
    pub fn load(table_cache: Arc<TableCache>, options: Arc<Options>, number: u64) -> Result<Self> {
        let data = manifest::read_descriptor(table_cache.db_name(), number)?;
        let mut reader = data.as_slice();
        let version = Version::decode_from(table_cache, options, &mut reader)?;
        if !reader.is_empty() {
            return Err(Error::Corruption(format!(
                "manifest {number} has {} trailing bytes",
                reader.len()
            )));
        }
        Ok(version)
    }

    /// Write this catalog to a new descriptor file and return its number.
    ///
    /// The number is taken from the file counter before encoding, so the
    /// saved catalog already accounts for it.
    pub fn save(&mut self) -> Result<u64> {
        let number = self.new_file_number();
        let mut data = Vec::new();
        self.encode_to(&mut data)?;
        manifest::write_descriptor(self.table_cache.db_name(), number, &data)?;
        Ok(number)
    }

    pub fn new_file_number(&mut self) -> u64 {
        let number = self.next_file_number;
        self.next_file_number += 1;
        number
    }

    pub fn next_file_number(&self) -> u64 {
        self.next_file_number
    }

    /// Last sequence number recorded in this catalog.
    pub fn last_sequence(&self) -> u64 {
        self.seq
    }

    pub fn set_last_sequence(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub fn num_level_files(&self, level: usize) -> usize {
        self.files[level].len()
    }

    pub fn level_files(&self, level: usize) -> &[Arc<FileMetaData>] {
        &self.files[level]
    }

    pub fn level_bytes(&self, level: usize) -> u64 {
        self.files[level].iter().map(|f| f.file_size).sum()
    }

    /// Every table number referenced by the catalog.
    pub fn live_files(&self) -> Vec<u64> {
        self.files.iter().flatten().map(|f| f.number).collect()
    }

    /// Look up the newest version of `user_key` across all levels.
    ///
    /// We can search level-by-level since entries never hop across levels.
    /// Therefore if we find data (a value or a tombstone) in a smaller
    /// level, later levels are irrelevant.
    pub fn get(&self, user_key: &[u8]) -> Result<LookupResult> {
        for level in 0..NUM_LEVELS {
            let files = &self.files[level];
            if files.is_empty() {
                continue;
            }

            let candidates: Vec<&Arc<FileMetaData>> = if level == 0 {
                // Level-0 files may overlap each other. Check every file
                // that covers the key, newest first.
                let mut overlapping: Vec<_> =
                    files.iter().filter(|f| f.contains_user_key(user_key)).collect();
                overlapping.sort_by(|a, b| b.number.cmp(&a.number));
                overlapping
            } else {
                let index = find_file(files, user_key);
                match files.get(index) {
                    Some(f) if f.smallest.user_key.as_slice() <= user_key => vec![f],
                    _ => Vec::new(),
                }
            };

            for f in candidates {
                match self.table_cache.get(f.number, user_key)? {
                    LookupResult::NotFound => continue,
                    resolved => return Ok(resolved),
                }
            }
        }
        Ok(LookupResult::NotFound)
    }

    /// Flush a memtable into a new table and add it to the catalog.
    ///
    /// Returns the level the table landed on and its number, or `None` for
    /// an empty memtable.
    pub fn write_level0_table(&mut self, mem: &MemTable) -> Result<Option<(usize, u64)>> {
        let mut iter = mem.iter();
        iter.seek_to_first()?;
        if !iter.valid() {
            return Ok(None);
        }

        let number = self.new_file_number();
        let db_name = self.table_cache.db_name().to_path_buf();
        let meta = match write_table(&db_name, number, &self.options, &mut iter) {
            Ok(meta) => meta,
            Err(e) => {
                remove_table(&db_name, number);
                return Err(e);
            }
        };

        // Pick a level: push the table down while it overlaps nothing.
        let (smallest, largest) = (&meta.smallest.user_key, &meta.largest.user_key);
        let mut level = 0;
        if !self.overlap_in_level(0, smallest, largest) {
            while level < MAX_MEM_COMPACT_LEVEL
                && !self.overlap_in_level(level + 1, smallest, largest)
            {
                level += 1;
            }
        }

        info!(
            "flushed memtable ({} entries) to table #{number} ({} bytes) at level {level}",
            mem.len(),
            meta.file_size
        );
        self.add_file(level, meta);
        Ok(Some((level, number)))
    }

    /// Pick and run one compaction. Returns `false` when no level needs one.
    ///
    /// On error the catalog is left untouched and any partially written
    /// outputs are removed.
    pub fn do_compaction_work(&mut self) -> Result<bool> {
        let Some(c) = self.pick_compaction() else {
            return Ok(false);
        };
        c.log();

        if c.is_trivial_move() {
            // Move file to next level
            let f = Arc::clone(&c.inputs[0][0]);
            self.delete_file(c.level, f.number);
            self.compact_pointer[c.level] = Some(f.largest.clone());
            info!("moved table #{} to level {}", f.number, c.level + 1);
            self.add_file(c.level + 1, f);
            return Ok(true);
        }

        let mut created = Vec::new();
        let outputs = match self.merge_inputs(&c, &mut created) {
            Ok(outputs) => outputs,
            Err(e) => {
                let db_name = self.table_cache.db_name().to_path_buf();
                for number in created {
                    remove_table(&db_name, number);
                }
                return Err(e);
            }
        };

        for f in &c.inputs[0] {
            self.delete_file(c.level, f.number);
        }
        for f in &c.inputs[1] {
            self.delete_file(c.level + 1, f.number);
        }
        if let Some(last) = c.inputs[0].iter().map(|f| &f.largest).max() {
            self.compact_pointer[c.level] = Some(last.clone());
        }
        info!(
            "compacted {} tables into {} at level {}",
            c.num_input_files(),
            outputs.len(),
            c.level + 1
        );
        for f in outputs {
            self.add_file(c.level + 1, f);
        }
        Ok(true)
    }

    /// Merge every input of `c`, keeping the newest entry of each user key
    /// (tombstones included), into tables of at most `max_file_size`.
    fn merge_inputs(
        &mut self,
        c: &Compaction,
        created: &mut Vec<u64>,
    ) -> Result<Vec<Arc<FileMetaData>>> {
        let mut children: Vec<Box<dyn StorageIterator>> = Vec::with_capacity(c.num_input_files());
        for f in c.inputs.iter().flatten() {
            children.push(Box::new(self.table_cache.new_iterator(f.number)?));
        }
        let mut iter = MergingIterator::new(children);
        iter.seek_to_first()?;

        let db_name = self.table_cache.db_name().to_path_buf();
        let mut outputs = Vec::new();
        let mut pending: Option<PendingTable> = None;
        let mut current_user_key: Option<Vec<u8>> = None;
        let mut dropped = 0u64;

        while iter.valid() {
            let key = iter.internal_key();
            if let Some(current) = &current_user_key {
                match user_key_compare(&key.user_key, current) {
                    std::cmp::Ordering::Equal => {
                        // Hidden by a newer entry for the same user key.
                        dropped += 1;
                        iter.next()?;
                        continue;
                    }
                    std::cmp::Ordering::Less => {
                        return Err(Error::Corruption(format!(
                            "compaction input out of order: {:?} after {:?}",
                            String::from_utf8_lossy(&key.user_key),
                            String::from_utf8_lossy(current),
                        )));
                    }
                    std::cmp::Ordering::Greater => {}
                }
            }
            current_user_key = Some(key.user_key.clone());

            let mut table = match pending.take() {
                Some(table) => table,
                None => {
                    let number = self.new_file_number();
                    created.push(number);
                    PendingTable::create(&db_name, number, &self.options, key)?
                }
            };
            table.add(key)?;
            if table.builder.file_size() > self.options.max_file_size {
                outputs.push(table.finish()?);
            } else {
                pending = Some(table);
            }
            iter.next()?;
        }
        if let Some(last) = pending.take() {
            outputs.push(last.finish()?);
        }
        debug!("compaction dropped {dropped} shadowed entries");
        Ok(outputs)
    }

    /// Pick the files for the next compaction, or `None` when every level
    /// is within budget.
    pub fn pick_compaction(&self) -> Option<Compaction> {
        let level = self.pick_compaction_level()?;
        let mut c = Compaction::new(level);

        if level == 0 {
            // Files in level 0 may overlap each other, so take all of them
            c.inputs[0] = self.files[0].clone();
        } else {
            // Pick the first file that comes after compact_pointer[level]
            let files = &self.files[level];
            let picked = files
                .iter()
                .find(|f| match &self.compact_pointer[level] {
                    Some(pointer) => f.largest > *pointer,
                    None => true,
                })
                .or_else(|| files.first())?;
            c.inputs[0].push(Arc::clone(picked));
        }

        let smallest = c.inputs[0].iter().map(|f| &f.smallest.user_key).min()?;
        let largest = c.inputs[0].iter().map(|f| &f.largest.user_key).max()?;
        c.inputs[1] = self.files[level + 1]
            .iter()
            .filter(|f| f.largest.user_key >= *smallest && f.smallest.user_key <= *largest)
            .cloned()
            .collect();
        Some(c)
    }

    /// Level with the highest score above 1.0; ties go to the lower level.
    ///
    /// Level 0 is scored by file count instead of bytes: its files are
    /// merged on every read, so many small files hurt even when the total
    /// size is modest.
    pub fn pick_compaction_level(&self) -> Option<usize> {
        let mut best_level = None;
        let mut best_score = 1.0;
        for level in 0..NUM_LEVELS - 1 {
            let score = if level == 0 {
                self.files[0].len() as f64 / self.options.l0_compaction_trigger.max(1) as f64
            } else {
                self.level_bytes(level) as f64 / max_bytes_for_level(level)
            };
            if score > best_score {
                best_score = score;
                best_level = Some(level);
            }
        }
        best_level
    }

    /// Whether a compaction would be picked right now.
    pub fn needs_compaction(&self) -> bool {
        self.pick_compaction_level().is_some()
    }

    /// Add the specified file at the specified level.
    pub fn add_file(&mut self, level: usize, meta: Arc<FileMetaData>) {
        if level == 0 {
            // level-0 is unsorted
            self.files[0].push(meta);
        } else {
            let index = find_file(&self.files[level], &meta.smallest.user_key);
            self.files[level].insert(index, meta);
        }
    }

    /// Delete file `number` from the specified level.
    pub fn delete_file(&mut self, level: usize, number: u64) {
        if let Some(pos) = self.files[level].iter().position(|f| f.number == number) {
            self.files[level].remove(pos);
        }
    }

    /// Returns true iff some file in the specified level overlaps the
    /// inclusive user-key range `[smallest, largest]`.
    pub fn overlap_in_level(&self, level: usize, smallest: &[u8], largest: &[u8]) -> bool {
        let files = &self.files[level];
        if level == 0 {
            files.iter().any(|f| {
                !(smallest > f.largest.user_key.as_slice()
                    || f.smallest.user_key.as_slice() > largest)
            })
        } else {
            match files.get(find_file(files, smallest)) {
                Some(f) => largest >= f.smallest.user_key.as_slice(),
                None => false,
            }
        }
    }

    pub fn log(&self) {
        for (level, files) in self.files.iter().enumerate() {
            if !files.is_empty() {
                let numbers: Vec<u64> = files.iter().map(|f| f.number).collect();
                debug!("version level {level}: {numbers:?}");
            }
        }
    }

    /// `next_file_number u64 | seq u64 | per level: i32 count, files`
    pub fn encode_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.next_file_number.to_le_bytes())?;
        w.write_all(&self.seq.to_le_bytes())?;
        for files in &self.files {
            w.write_all(&(files.len() as i32).to_le_bytes())?;
            for f in files {
                f.encode_to(w)?;
            }
        }
        Ok(())
    }

    pub fn decode_from<R: Read>(
        table_cache: Arc<TableCache>,
        options: Arc<Options>,
        r: &mut R,
    ) -> Result<Self> {
        let mut version = Version::new(table_cache, options);
        version.next_file_number = read_u64(r)?;
        version.seq = read_u64(r)?;
        for level in 0..NUM_LEVELS {
            let count = read_u32(r)? as i32;
            if count < 0 {
                return Err(Error::Corruption(format!(
                    "negative file count {count} at level {level}"
                )));
            }
            let mut files = Vec::new();
            for _ in 0..count {
                files.push(Arc::new(FileMetaData::decode_from(r)?));
            }
            if let Some(max) = files.iter().map(|f| f.number).max() {
                if max >= version.next_file_number {
                    warn!(
                        "manifest names table #{max} at or past next file number {}",
                        version.next_file_number
                    );
                    version.next_file_number = max + 1;
                }
            }
            version.files[level] = files;
        }
        Ok(version)
    }
}

/// Drain a positioned memtable cursor into table `number`.
fn write_table(
    db_name: &Path,
    number: u64,
    options: &Options,
    iter: &mut MemTableIterator<'_>,
) -> Result<Arc<FileMetaData>> {
    let mut table = PendingTable::create(db_name, number, options, iter.internal_key())?;
    while iter.valid() {
        table.add(iter.internal_key())?;
        iter.next()?;
    }
    table.finish()
}

/// Index of the first file whose largest user key is >= `user_key`, or
/// `files.len()` if there is none.
pub fn find_file(files: &[Arc<FileMetaData>], user_key: &[u8]) -> usize {
    files.partition_point(|f| f.largest.user_key.as_slice() < user_key)
}

fn remove_table(db_name: &Path, number: u64) {
    if let Err(e) = std::fs::remove_file(table_file_name(db_name, number)) {
        warn!("failed to remove partial table #{number}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;
    use tempfile::tempdir;

    fn meta(number: u64, smallest: &str, largest: &str) -> Arc<FileMetaData> {
        Arc::new(FileMetaData {
            allowed_seeks: ALLOWED_SEEKS,
            file_size: 100,
            number,
            smallest: InternalKey::new(1, ValueType::Value, smallest.into(), Vec::new()),
            largest: InternalKey::new(1, ValueType::Value, largest.into(), Vec::new()),
        })
    }

    fn empty_version(dir: &Path) -> Version {
        let db_name = dir.join("db");
        Version::new(
            Arc::new(TableCache::new(&db_name, 16)),
            Arc::new(Options::default()),
        )
    }

    #[test]
    fn file_meta_roundtrip() {
        let m = meta(7, "apple", "melon");
        let mut buf = Vec::new();
        m.encode_to(&mut buf).unwrap();
        assert_eq!(FileMetaData::decode_from(&mut buf.as_slice()).unwrap(), *m);
    }

    #[test]
    fn version_encoding_roundtrip() {
        let dir = tempdir().unwrap();
        let mut v = empty_version(dir.path());
        v.next_file_number = 20;
        v.seq = 12345;
        v.add_file(0, meta(3, "a", "z"));
        v.add_file(1, meta(5, "m", "p"));
        v.add_file(1, meta(4, "a", "c"));

        let mut buf = Vec::new();
        v.encode_to(&mut buf).unwrap();
        let decoded = Version::decode_from(
            Arc::clone(&v.table_cache),
            Arc::clone(&v.options),
            &mut buf.as_slice(),
        )
        .unwrap();
        assert_eq!(decoded.next_file_number, 20);
        assert_eq!(decoded.last_sequence(), 12345);
        for level in 0..NUM_LEVELS {
            assert_eq!(decoded.level_files(level), v.level_files(level));
        }
        // Level 1 stays sorted by smallest key.
        assert_eq!(decoded.level_files(1)[0].number, 4);
    }

    #[test]
    fn negative_count_is_corruption() {
        let dir = tempdir().unwrap();
        let v = empty_version(dir.path());
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            Version::decode_from(v.table_cache, v.options, &mut buf.as_slice()),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn overlap_is_inclusive() {
        let dir = tempdir().unwrap();
        let mut v = empty_version(dir.path());
        v.add_file(1, meta(1, "d", "f"));
        v.add_file(0, meta(2, "m", "p"));

        assert!(v.overlap_in_level(1, b"a", b"d"));
        assert!(v.overlap_in_level(1, b"f", b"g"));
        assert!(!v.overlap_in_level(1, b"a", b"c"));
        assert!(!v.overlap_in_level(1, b"g", b"z"));

        assert!(v.overlap_in_level(0, b"p", b"q"));
        assert!(!v.overlap_in_level(0, b"q", b"r"));
        assert!(!v.overlap_in_level(2, b"a", b"z"));
    }

    #[test]
    fn find_file_binary_search() {
        let files = vec![meta(1, "a", "c"), meta(2, "e", "g"), meta(3, "k", "m")];
        assert_eq!(find_file(&files, b"a"), 0);
        assert_eq!(find_file(&files, b"d"), 1);
        assert_eq!(find_file(&files, b"g"), 1);
        assert_eq!(find_file(&files, b"z"), 3);
    }

    #[test]
    fn pick_level_zero_by_file_count() {
        let dir = tempdir().unwrap();
        let mut v = empty_version(dir.path());
        for n in 1..=4 {
            v.add_file(0, meta(n, "a", "b"));
        }
        // 4 files / trigger 4 = 1.0, not above the threshold.
        assert_eq!(v.pick_compaction_level(), None);

        v.add_file(0, meta(5, "a", "b"));
        assert_eq!(v.pick_compaction_level(), Some(0));

        v.add_file(1, meta(6, "a", "a"));
        v.add_file(1, meta(7, "x", "y"));
        let c = v.pick_compaction().unwrap();
        assert_eq!(c.inputs[0].len(), 5);
        assert_eq!(c.inputs[1].len(), 1);
        assert_eq!(c.inputs[1][0].number, 6);
        assert!(!c.is_trivial_move());
    }

    fn sized(number: u64, smallest: &str, largest: &str, file_size: u64) -> Arc<FileMetaData> {
        let mut m = (*meta(number, smallest, largest)).clone();
        m.file_size = file_size;
        Arc::new(m)
    }

    #[test]
    fn compact_pointer_round_robin() {
        let dir = tempdir().unwrap();
        let mut v = empty_version(dir.path());
        v.add_file(1, sized(1, "a", "b", 6 << 20));
        v.add_file(1, sized(2, "c", "d", 6 << 20));

        let picked = |v: &Version| v.pick_compaction().unwrap().inputs[0][0].number;
        assert_eq!(picked(&v), 1);
        v.compact_pointer[1] = Some(v.files[1][0].largest.clone());
        assert_eq!(picked(&v), 2);
        v.compact_pointer[1] = Some(v.files[1][1].largest.clone());
        // Past the last file: wrap around.
        assert_eq!(picked(&v), 1);
    }

    #[test]
    fn flush_lands_at_deepest_free_level() {
        let dir = tempdir().unwrap();
        let mut v = empty_version(dir.path());

        let mem = MemTable::new();
        mem.add(1, ValueType::Value, b"a", b"1");
        mem.add(2, ValueType::Value, b"b", b"2");
        assert_eq!(v.write_level0_table(&mem).unwrap(), Some((2, 1)));

        // Overlaps the table now at level 2: stops at level 1.
        let mem = MemTable::new();
        mem.add(3, ValueType::Value, b"b", b"3");
        assert_eq!(v.write_level0_table(&mem).unwrap(), Some((1, 2)));

        // Overlaps level 1: stays at level 0.
        let mem = MemTable::new();
        mem.add(4, ValueType::Deletion, b"b", b"");
        assert_eq!(v.write_level0_table(&mem).unwrap(), Some((0, 3)));

        assert_eq!(v.get(b"a").unwrap(), LookupResult::Value(b"1".to_vec()));
        assert_eq!(v.get(b"b").unwrap(), LookupResult::Deletion);
        assert_eq!(v.get(b"c").unwrap(), LookupResult::NotFound);

        // Empty memtable writes nothing.
        assert_eq!(v.write_level0_table(&MemTable::new()).unwrap(), None);
        assert_eq!(v.live_files().len(), 3);
    }

    #[test]
    fn trivial_move_keeps_file_number() {
        let dir = tempdir().unwrap();
        let mut v = empty_version(dir.path());
        // 12 MiB at level 1 is over its 10 MiB budget; level 2 is empty.
        v.add_file(1, sized(1, "a", "b", 6 << 20));
        v.add_file(1, sized(2, "c", "d", 6 << 20));

        let c = v.pick_compaction().unwrap();
        assert!(c.is_trivial_move());
        assert!(v.do_compaction_work().unwrap());

        assert_eq!(v.level_files(2).len(), 1);
        assert_eq!(v.level_files(2)[0].number, 1);
        assert_eq!(v.level_files(1)[0].number, 2);
        assert_eq!(v.compact_pointer[1].as_ref().unwrap().user_key, b"b");

        // 6 MiB left at level 1: balanced.
        assert!(!v.do_compaction_work().unwrap());
    }
}
