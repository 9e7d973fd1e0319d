pub mod skiplist;

use std::sync::atomic::{AtomicUsize, Ordering};

use skiplist::{SkipList, SkipListIterator};

use crate::error::Result;
use crate::iterator::{ReversibleIterator, StorageIterator};
use crate::types::{
    InternalKey, InternalKeyComparator, LookupResult, MAX_SEQUENCE_NUMBER, ValueType,
};

/// Per-entry bookkeeping charged on top of the key and value bytes.
const ENTRY_OVERHEAD: usize = 16;

/// In-memory sorted buffer for writes. Wraps a SkipList of internal keys.
///
/// Every write goes here first. When size exceeds the write buffer size,
/// the memtable is frozen (becomes immutable) and flushed to an SSTable.
///
/// Deletes are handled via tombstones: an entry of type `Deletion` that
/// means "this key is deleted." You can't just remove the key because older
/// versions may exist in SSTables on disk. Past entries are never touched:
/// a newer version shadows an older one by sorting in front of it.
pub struct MemTable {
    table: SkipList<InternalKey, InternalKeyComparator>,
    memory_usage: AtomicUsize,
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTable {
    /// Create a new empty memtable.
    pub fn new() -> Self {
        MemTable {
            table: SkipList::new(InternalKeyComparator),
            memory_usage: AtomicUsize::new(0),
        }
    }

    /// Record a write. Never blocks on readers for longer than one splice.
    pub fn add(&self, sequence: u64, value_type: ValueType, key: &[u8], value: &[u8]) {
        let internal_key = InternalKey::new(sequence, value_type, key.to_vec(), value.to_vec());
        self.memory_usage
            .fetch_add(ENTRY_OVERHEAD + key.len() + value.len(), Ordering::Relaxed);
        self.table.insert(internal_key);
    }

    /// Look up the newest version of `key`.
    pub fn get(&self, key: &[u8]) -> LookupResult {
        self.get_at(key, MAX_SEQUENCE_NUMBER)
    }

    /// Look up the newest version of `key` with sequence <= `sequence`.
    pub fn get_at(&self, key: &[u8], sequence: u64) -> LookupResult {
        let mut it = self.table.iter();
        it.seek(&InternalKey::lookup(key, sequence));
        if !it.valid() {
            return LookupResult::NotFound;
        }
        // The seek already skipped every version newer than `sequence`, so
        // only the user key needs checking.
        let found = it.key();
        if found.user_key != key {
            return LookupResult::NotFound;
        }
        match found.value_type {
            ValueType::Value => LookupResult::Value(found.user_value.clone()),
            ValueType::Deletion => LookupResult::Deletion,
        }
    }

    /// Return a sorted iterator over all entries (including tombstones).
    /// The iterator starts unpositioned; call `seek_to_first` first.
    pub fn iter(&self) -> MemTableIterator<'_> {
        MemTableIterator {
            inner: self.table.iter(),
        }
    }

    /// Approximate memory usage in bytes. A heuristic for flush decisions.
    pub fn approximate_memory_usage(&self) -> usize {
        self.memory_usage.load(Ordering::Relaxed)
    }

    /// Number of entries, counting every version and tombstone.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Iterator over memtable entries in InternalKey order.
pub struct MemTableIterator<'a> {
    inner: SkipListIterator<'a, InternalKey, InternalKeyComparator>,
}

impl StorageIterator for MemTableIterator<'_> {
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn internal_key(&self) -> &InternalKey {
        self.inner.key()
    }

    fn next(&mut self) -> Result<()> {
        self.inner.next();
        Ok(())
    }

    fn seek_to_first(&mut self) -> Result<()> {
        self.inner.seek_to_first();
        Ok(())
    }

    fn seek(&mut self, user_key: &[u8]) -> Result<()> {
        self.inner
            .seek(&InternalKey::lookup(user_key, MAX_SEQUENCE_NUMBER));
        Ok(())
    }
}

impl ReversibleIterator for MemTableIterator<'_> {
    fn prev(&mut self) -> Result<()> {
        self.inner.prev();
        Ok(())
    }

    fn seek_to_last(&mut self) -> Result<()> {
        self.inner.seek_to_last();
        Ok(())
    }
}
