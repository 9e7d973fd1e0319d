use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::bloom::BloomFilterBuilder;
use crate::config::Options;
use crate::error::{Error, Result};
use crate::sstable::FILTER_META_KEY;
use crate::sstable::block::BlockBuilder;
use crate::sstable::footer::{BlockHandle, Footer, index_entry};
use crate::types::{InternalKey, ValueType};

/// Builds an SSTable file from a sorted stream of internal keys.
///
/// Used during:
/// - Memtable flush (sorted memtable → SSTable)
/// - Compaction (merged iterators → new SSTables)
///
/// Build process:
/// 1. Add entries one by one (must be in InternalKey order)
/// 2. Entries fill up blocks; when a block is full it's written to disk
/// 3. finish() flushes the last block, writes the optional filter, the
///    index and the footer, then fsyncs
pub struct TableBuilder {
    /// Current block being filled with entries.
    data_block: BlockBuilder,
    /// One entry per flushed data block: its largest key + its handle.
    index_block: BlockBuilder,
    /// Present only when filters are enabled.
    filter: Option<BloomFilterBuilder>,
    /// Bytes handed to the writer so far.
    offset: u64,
    writer: BufWriter<File>,
    /// Last key added to the current data block (needed for its index entry).
    last_key: Option<InternalKey>,
    num_entries: u64,
}

impl TableBuilder {
    /// Create a new table builder that writes to the given path.
    pub fn new(path: &Path, options: &Options) -> Result<Self> {
        let writer = BufWriter::new(File::create(path)?);
        Ok(TableBuilder {
            data_block: BlockBuilder::new(options.block_size),
            // Index entries are never split across blocks.
            index_block: BlockBuilder::new(usize::MAX),
            filter: options.bloom_false_positive_rate.map(BloomFilterBuilder::new),
            offset: 0,
            writer,
            last_key: None,
            num_entries: 0,
        })
    }

    /// Add an entry. MUST be called in InternalKey order.
    ///
    /// Internally:
    /// 1. Try adding to the current block
    /// 2. If block is full: flush block to file, record index entry, start new block
    /// 3. Add the entry to the new block
    pub fn add(&mut self, key: &InternalKey) -> Result<()> {
        if let Some(filter) = self.filter.as_mut() {
            filter.add_key(&key.user_key);
        }

        if !self.data_block.add(key) {
            self.flush_data_block()?;
            // The first entry of a block is always accepted.
            self.data_block.add(key);
        }
        self.last_key = Some(key.without_value());
        self.num_entries += 1;
        Ok(())
    }

    /// Bytes written to the file so far (excluding the block in progress).
    pub fn file_size(&self) -> u64 {
        self.offset
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Finalize the table: flush the last block, write the optional filter
    /// and meta-index blocks, the index block and the footer, then fsync.
    /// Returns the final file size.
    pub fn finish(mut self) -> Result<u64> {
        self.flush_data_block()?;

        let meta_index_handle = match self.filter.take() {
            Some(filter) => {
                let filter_handle = self.write_raw(&filter.build().serialize())?;
                let mut meta_index = BlockBuilder::new(usize::MAX);
                let name =
                    InternalKey::new(0, ValueType::Value, FILTER_META_KEY.to_vec(), Vec::new());
                meta_index.add(&index_entry(&name, filter_handle));
                self.write_raw(&meta_index.finish())?
            }
            None => BlockHandle::new(handle_u32(self.offset)?, 0),
        };

        let index_data = self.index_block.finish();
        let index_handle = self.write_raw(&index_data)?;

        let footer = Footer {
            meta_index_handle,
            index_handle,
        };
        self.writer.write_all(&footer.encode())?;
        self.offset += Footer::SIZE as u64;

        // Flush buffer + fsync to guarantee durability
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.offset)
    }

    /// Flush the current data block to disk and record its index entry.
    fn flush_data_block(&mut self) -> Result<()> {
        if self.data_block.is_empty() {
            return Ok(());
        }
        let data = self.data_block.finish();
        let handle = self.write_raw(&data)?;
        if let Some(last_key) = self.last_key.as_ref() {
            self.index_block.add(&index_entry(last_key, handle));
        }
        Ok(())
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<BlockHandle> {
        let handle = BlockHandle::new(handle_u32(self.offset)?, handle_u32(data.len() as u64)?);
        self.writer.write_all(data)?;
        self.offset += data.len() as u64;
        Ok(handle)
    }
}

/// Block handles are 32-bit, which caps a table at 4 GiB.
fn handle_u32(value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::Corruption(format!("table offset {value} exceeds 32-bit handle")))
}
