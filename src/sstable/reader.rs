use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::bloom::BloomFilter;
use crate::error::{Error, Result};
use crate::sstable::FILTER_META_KEY;
use crate::sstable::block::Block;
use crate::sstable::footer::{BlockHandle, Footer, index_entry_handle};
use crate::sstable::iterator::SSTableIterator;
use crate::types::{LookupResult, ValueType};

/// An opened SSTable file. Supports point lookups and ordered iteration.
///
/// On open:
/// 1. Read footer (last 24 bytes) → find index and meta-index block positions
/// 2. Read and parse the index block
/// 3. If the meta-index names a filter block, read and deserialize it
/// 4. Ready for queries (data blocks read on demand)
pub struct SSTable {
    /// Path to the SSTable file (for debugging/error messages).
    path: PathBuf,
    /// Open file handle for reading data blocks. Reads seek first, so they
    /// are serialized per handle.
    file: Mutex<File>,
    file_size: u64,
    /// One entry per data block: the block's largest key, valued with the
    /// block's encoded handle.
    index: Arc<Block>,
    filter: Option<BloomFilter>,
}

impl SSTable {
    /// Open an SSTable file.
    ///
    /// Fails with `TableTooShort` when the file cannot hold a footer and
    /// with `BadMagic` when the footer is not ours.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < Footer::SIZE as u64 {
            return Err(Error::TableTooShort(file_size));
        }

        let footer = {
            let mut buf = [0u8; Footer::SIZE];
            file.seek(SeekFrom::Start(file_size - Footer::SIZE as u64))?;
            file.read_exact(&mut buf)?;
            Footer::decode(&buf)?
        };
        let data_limit = file_size - Footer::SIZE as u64;

        let index = Block::decode(&read_at(&mut file, footer.index_handle, data_limit)?)?;

        let filter = if footer.meta_index_handle.size == 0 {
            None
        } else {
            let meta_index =
                Block::decode(&read_at(&mut file, footer.meta_index_handle, data_limit)?)?;
            match meta_index.get(FILTER_META_KEY) {
                Some(entry) => {
                    let handle = index_entry_handle(entry)?;
                    Some(BloomFilter::deserialize(&read_at(&mut file, handle, data_limit)?)?)
                }
                None => {
                    warn!("{}: meta-index block without a filter entry", path.display());
                    None
                }
            }
        };

        Ok(SSTable {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            file_size,
            index: Arc::new(index),
            filter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub(crate) fn index(&self) -> &Arc<Block> {
        &self.index
    }

    /// Read and decode the data block behind `handle`.
    pub fn read_block(&self, handle: BlockHandle) -> Result<Arc<Block>> {
        let data = {
            let mut file = self.file.lock();
            read_at(&mut file, handle, self.file_size - Footer::SIZE as u64)?
        };
        Ok(Arc::new(Block::decode(&data)?))
    }

    /// Point lookup for the newest version of `user_key`.
    ///
    /// Algorithm:
    /// 1. If a filter is present and rejects the key → `NotFound`
    /// 2. Binary search the index for the first block whose largest key
    ///    is >= the target
    /// 3. Read that block and binary search inside it
    pub fn get(&self, user_key: &[u8]) -> Result<LookupResult> {
        if let Some(filter) = &self.filter {
            if !filter.may_contain(user_key) {
                return Ok(LookupResult::NotFound);
            }
        }

        let items = self.index.items();
        let block_idx = items.partition_point(|entry| entry.user_key.as_slice() < user_key);
        let Some(entry) = items.get(block_idx) else {
            // Past the largest key in the table.
            return Ok(LookupResult::NotFound);
        };

        let block = self.read_block(index_entry_handle(entry)?)?;
        Ok(match block.get(user_key) {
            Some(found) => match found.value_type {
                ValueType::Value => LookupResult::Value(found.user_value.clone()),
                ValueType::Deletion => LookupResult::Deletion,
            },
            None => LookupResult::NotFound,
        })
    }

    /// Two-level cursor over the table. Starts unpositioned.
    pub fn iter(self: &Arc<Self>) -> SSTableIterator {
        SSTableIterator::new(Arc::clone(self))
    }
}

fn read_at(file: &mut File, handle: BlockHandle, limit: u64) -> Result<Vec<u8>> {
    if handle.end() > limit {
        return Err(Error::Corruption(format!(
            "block [{}, {}) extends past the data region ({limit} bytes)",
            handle.offset,
            handle.end()
        )));
    }
    let mut buf = vec![0u8; handle.size as usize];
    file.seek(SeekFrom::Start(handle.offset as u64))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}
