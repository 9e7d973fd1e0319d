use std::sync::Arc;

use crate::error::Result;
use crate::iterator::{ReversibleIterator, StorageIterator};
use crate::sstable::block::BlockIterator;
use crate::sstable::footer::index_entry_handle;
use crate::sstable::reader::SSTable;
use crate::types::InternalKey;

/// Two-level iterator over an SSTable.
///
/// The outer cursor walks the index block; the inner cursor walks the data
/// block the index currently points at, loaded on demand. Empty data blocks
/// are skipped in both directions.
pub struct SSTableIterator {
    table: Arc<SSTable>,
    index_iter: BlockIterator,
    data_iter: Option<BlockIterator>,
}

impl SSTableIterator {
    pub(crate) fn new(table: Arc<SSTable>) -> Self {
        let index_iter = table.index().iter();
        SSTableIterator {
            table,
            index_iter,
            data_iter: None,
        }
    }

    /// Load the data block under the index cursor, or clear it when the
    /// index cursor is exhausted.
    fn init_data_block(&mut self) -> Result<()> {
        self.data_iter = if self.index_iter.valid() {
            let handle = index_entry_handle(self.index_iter.internal_key())?;
            Some(self.table.read_block(handle)?.iter())
        } else {
            None
        };
        Ok(())
    }

    fn data_valid(&self) -> bool {
        self.data_iter.as_ref().is_some_and(|data| data.valid())
    }

    fn skip_empty_blocks_forward(&mut self) -> Result<()> {
        while self.data_iter.is_some() && !self.data_valid() {
            self.index_iter.next()?;
            self.init_data_block()?;
            if let Some(data) = self.data_iter.as_mut() {
                data.seek_to_first()?;
            }
        }
        Ok(())
    }

    fn skip_empty_blocks_backward(&mut self) -> Result<()> {
        while self.data_iter.is_some() && !self.data_valid() {
            self.index_iter.prev()?;
            self.init_data_block()?;
            if let Some(data) = self.data_iter.as_mut() {
                data.seek_to_last()?;
            }
        }
        Ok(())
    }
}

impl StorageIterator for SSTableIterator {
    fn valid(&self) -> bool {
        self.data_valid()
    }

    fn internal_key(&self) -> &InternalKey {
        match &self.data_iter {
            Some(data) => data.internal_key(),
            None => panic!("SSTableIterator::internal_key called on an invalid iterator"),
        }
    }

    fn next(&mut self) -> Result<()> {
        if let Some(data) = self.data_iter.as_mut() {
            data.next()?;
        }
        self.skip_empty_blocks_forward()
    }

    fn seek_to_first(&mut self) -> Result<()> {
        self.index_iter.seek_to_first()?;
        self.init_data_block()?;
        if let Some(data) = self.data_iter.as_mut() {
            data.seek_to_first()?;
        }
        self.skip_empty_blocks_forward()
    }

    fn seek(&mut self, user_key: &[u8]) -> Result<()> {
        // First block whose largest key is >= target; past every block means
        // the target is beyond the table and the cursor goes invalid.
        self.index_iter.seek(user_key)?;
        self.init_data_block()?;
        if let Some(data) = self.data_iter.as_mut() {
            data.seek(user_key)?;
        }
        self.skip_empty_blocks_forward()
    }
}

impl ReversibleIterator for SSTableIterator {
    fn prev(&mut self) -> Result<()> {
        if let Some(data) = self.data_iter.as_mut() {
            data.prev()?;
        }
        self.skip_empty_blocks_backward()
    }

    fn seek_to_last(&mut self) -> Result<()> {
        self.index_iter.seek_to_last()?;
        self.init_data_block()?;
        if let Some(data) = self.data_iter.as_mut() {
            data.seek_to_last()?;
        }
        self.skip_empty_blocks_backward()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::sstable::TableBuilder;
    use crate::types::ValueType;
    use tempfile::tempdir;

    fn open_table(n: u32, block_size: usize) -> (tempfile::TempDir, Arc<SSTable>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iter.sst");
        let options = Options {
            block_size,
            ..Options::default()
        };
        let mut builder = TableBuilder::new(&path, &options).unwrap();
        for i in 0..n {
            builder
                .add(&InternalKey::new(
                    i as u64,
                    ValueType::Value,
                    format!("k{i:04}").into_bytes(),
                    b"v".to_vec(),
                ))
                .unwrap();
        }
        builder.finish().unwrap();
        let table = Arc::new(SSTable::open(&path).unwrap());
        (dir, table)
    }

    #[test]
    fn forward_and_backward_cover_every_entry() {
        let (_dir, table) = open_table(300, 128);
        let mut iter = table.iter();

        iter.seek_to_first().unwrap();
        let mut forward = Vec::new();
        while iter.valid() {
            forward.push(iter.internal_key().user_key.clone());
            iter.next().unwrap();
        }
        assert_eq!(forward.len(), 300);
        assert!(forward.windows(2).all(|w| w[0] < w[1]));

        iter.seek_to_last().unwrap();
        let mut backward = Vec::new();
        while iter.valid() {
            backward.push(iter.internal_key().user_key.clone());
            iter.prev().unwrap();
        }
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn seek_lands_on_next_key_or_invalid() {
        let (_dir, table) = open_table(100, 128);
        let mut iter = table.iter();

        iter.seek(b"k0042").unwrap();
        assert_eq!(iter.internal_key().user_key, b"k0042");

        // Between keys: next larger one.
        iter.seek(b"k0042a").unwrap();
        assert_eq!(iter.internal_key().user_key, b"k0043");

        iter.seek(b"").unwrap();
        assert_eq!(iter.internal_key().user_key, b"k0000");

        // Past the last key.
        iter.seek(b"k0099a").unwrap();
        assert!(!iter.valid());
    }
}
