use std::sync::Arc;

use crate::error::{Error, Result};
use crate::iterator::{ReversibleIterator, StorageIterator};
use crate::sstable::block::BLOCK_TRAILER_SIZE;
use crate::types::InternalKey;

/// A decoded block: every entry parsed up front into a sorted vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    items: Vec<InternalKey>,
}

impl Block {
    /// Parse a block produced by `BlockBuilder::finish`.
    ///
    /// Reads the entry count from the trailer, then decodes that many
    /// entries from the front. Fails on a missing trailer, truncated entries,
    /// or bytes left over after the last entry.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < BLOCK_TRAILER_SIZE {
            return Err(Error::Corruption(format!(
                "block too short: {} bytes",
                data.len()
            )));
        }
        let (mut entries, trailer) = data.split_at(data.len() - BLOCK_TRAILER_SIZE);
        let mut count = [0u8; BLOCK_TRAILER_SIZE];
        count.copy_from_slice(trailer);
        let count = u32::from_le_bytes(count) as usize;

        // Each entry is at least 17 bytes; don't trust a corrupt count for
        // the allocation.
        let mut items = Vec::with_capacity(count.min(entries.len() / 17 + 1));
        for _ in 0..count {
            items.push(InternalKey::decode_from(&mut entries)?);
        }
        if !entries.is_empty() {
            return Err(Error::Corruption(format!(
                "block has {} trailing bytes after {count} entries",
                entries.len()
            )));
        }
        Ok(Block { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[InternalKey] {
        &self.items
    }

    /// Index of the leftmost entry whose user key >= target, or `len()` when
    /// every entry is smaller.
    fn lower_bound(&self, target: &[u8]) -> usize {
        self.items
            .partition_point(|item| item.user_key.as_slice() < target)
    }

    /// Newest entry for exactly `user_key`, if any.
    pub fn get(&self, user_key: &[u8]) -> Option<&InternalKey> {
        self.items
            .get(self.lower_bound(user_key))
            .filter(|item| item.user_key == user_key)
    }

    /// Cursor over a shared block. Starts unpositioned.
    pub fn iter(self: &Arc<Self>) -> BlockIterator {
        BlockIterator {
            block: Arc::clone(self),
            index: self.items.len(),
        }
    }
}

/// Cursor over a block's entries. Position `len()` means "invalid".
pub struct BlockIterator {
    block: Arc<Block>,
    index: usize,
}

impl StorageIterator for BlockIterator {
    fn valid(&self) -> bool {
        self.index < self.block.items.len()
    }

    fn internal_key(&self) -> &InternalKey {
        &self.block.items[self.index]
    }

    fn next(&mut self) -> Result<()> {
        if self.valid() {
            self.index += 1;
        }
        Ok(())
    }

    fn seek_to_first(&mut self) -> Result<()> {
        self.index = 0;
        Ok(())
    }

    fn seek(&mut self, user_key: &[u8]) -> Result<()> {
        self.index = self.block.lower_bound(user_key);
        Ok(())
    }
}

impl ReversibleIterator for BlockIterator {
    fn prev(&mut self) -> Result<()> {
        self.index = match self.index {
            0 => self.block.items.len(),
            i if i < self.block.items.len() => i - 1,
            _ => self.index,
        };
        Ok(())
    }

    fn seek_to_last(&mut self) -> Result<()> {
        // An empty block stays invalid: index 0 == len().
        self.index = self.block.items.len().saturating_sub(1);
        Ok(())
    }
}
