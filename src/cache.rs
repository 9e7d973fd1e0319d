use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use lru::LruCache;
use parking_lot::Mutex;

use crate::error::Result;
use crate::filename::table_file_name;
use crate::sstable::{SSTable, SSTableIterator};
use crate::types::LookupResult;

/// Keeps a bounded number of SSTable handles open, keyed by file number.
///
/// Handles are shared: evicting one only closes the file once every
/// outstanding iterator over it is dropped.
pub struct TableCache {
    db_name: PathBuf,
    cache: Mutex<LruCache<u64, Arc<SSTable>>>,
}

impl TableCache {
    pub fn new(db_name: &Path, capacity: usize) -> Self {
        TableCache {
            db_name: db_name.to_path_buf(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn db_name(&self) -> &Path {
        &self.db_name
    }

    /// Fetch the handle for `file_number`, opening it on a miss.
    /// A failed open is returned to the caller and not remembered.
    pub fn find_table(&self, file_number: u64) -> Result<Arc<SSTable>> {
        let mut cache = self.cache.lock();
        if let Some(table) = cache.get(&file_number) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(SSTable::open(&table_file_name(&self.db_name, file_number))?);
        debug!("table cache: opened table #{file_number}");
        cache.put(file_number, Arc::clone(&table));
        Ok(table)
    }

    /// Point lookup in one table.
    pub fn get(&self, file_number: u64, user_key: &[u8]) -> Result<LookupResult> {
        self.find_table(file_number)?.get(user_key)
    }

    /// Unpositioned cursor over one table.
    pub fn new_iterator(&self, file_number: u64) -> Result<SSTableIterator> {
        Ok(self.find_table(file_number)?.iter())
    }

    /// Forget the handle for a table that is about to be deleted.
    pub fn evict(&self, file_number: u64) {
        self.cache.lock().pop(&file_number);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
