use crate::sstable::block::BLOCK_TRAILER_SIZE;
use crate::types::InternalKey;

/// Accumulates sorted internal keys and serializes them into a block.
///
/// A block is typically 4KB (matching OS page size / SSD block size).
///
/// On-disk layout of a block:
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │ Entry 0: encoded InternalKey (length-prefixed) │
/// │ Entry 1: ...                                 │
/// │ Entry N: ...                                 │
/// ├──────────────────────────────────────────────┤
/// │ Num entries (4B, little-endian)              │
/// └──────────────────────────────────────────────┘
/// ```
///
/// Entries are self-describing, so the count at the end is all a reader
/// needs to parse the block front to back.
pub struct BlockBuilder {
    data: Vec<u8>,
    counter: u32,
    block_size: usize,
}

impl BlockBuilder {
    /// Create a new block builder with target block size.
    pub fn new(block_size: usize) -> Self {
        BlockBuilder {
            data: Vec::new(),
            counter: 0,
            block_size,
        }
    }

    /// Add an entry to the block.
    /// Returns false if the block is full (entry doesn't fit).
    /// First entry is always accepted even if it exceeds block_size.
    /// Entries MUST be added in InternalKey order.
    pub fn add(&mut self, key: &InternalKey) -> bool {
        // Always accept the first entry so we never produce an empty block.
        if !self.is_empty() && self.estimated_size() + key.encoded_len() > self.block_size {
            return false;
        }
        // Writing into a Vec cannot fail.
        let _ = key.encode_to(&mut self.data);
        self.counter += 1;
        true
    }

    /// Finalize the block: append the entry count and hand over the bytes.
    /// The builder is left empty and ready for the next block.
    pub fn finish(&mut self) -> Vec<u8> {
        self.data.extend_from_slice(&self.counter.to_le_bytes());
        self.counter = 0;
        std::mem::take(&mut self.data)
    }

    /// Drop everything added since the last finish.
    pub fn reset(&mut self) {
        self.data.clear();
        self.counter = 0;
    }

    /// Current estimated size of the block (entries + count).
    pub fn estimated_size(&self) -> usize {
        self.data.len() + BLOCK_TRAILER_SIZE
    }

    /// Number of entries added since the last finish.
    pub fn len(&self) -> usize {
        self.counter as usize
    }

    /// Whether the block is empty (no entries added).
    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }
}
