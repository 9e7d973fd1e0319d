use crate::error::{Error, Result};
use crate::types::InternalKey;

/// Magic number to identify SSTable files.
pub const SSTABLE_MAGIC: u64 = 0x0000141e36d08385;

/// Location of a block inside a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHandle {
    pub offset: u32,
    pub size: u32,
}

impl BlockHandle {
    pub const SIZE: usize = 8;

    pub fn new(offset: u32, size: u32) -> Self {
        BlockHandle { offset, size }
    }

    /// Encode as `[offset(4B)][size(4B)]`.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..4].copy_from_slice(&self.offset.to_le_bytes());
        buf[4..].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::Corruption(format!(
                "block handle must be {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }
        let mut offset = [0u8; 4];
        let mut size = [0u8; 4];
        offset.copy_from_slice(&data[..4]);
        size.copy_from_slice(&data[4..]);
        Ok(BlockHandle {
            offset: u32::from_le_bytes(offset),
            size: u32::from_le_bytes(size),
        })
    }

    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

/// An index block entry: an internal key that bounds a block from above,
/// carrying the encoded handle of that block as its value.
///
/// In the index block the key is the data block's largest key; in the
/// meta-index block it names the meta block.
pub fn index_entry(key: &InternalKey, handle: BlockHandle) -> InternalKey {
    InternalKey::new(
        key.sequence,
        key.value_type,
        key.user_key.clone(),
        handle.encode().to_vec(),
    )
}

/// Recover the block handle stored in an index entry.
pub fn index_entry_handle(entry: &InternalKey) -> Result<BlockHandle> {
    BlockHandle::decode(&entry.user_value)
}

/// The footer sits at the end of the SSTable file.
/// It tells the reader where to find the index block and meta-index block.
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │ Meta-index block offset (4B)         │
/// │ Meta-index block size (4B)           │
/// │ Index block offset (4B)              │
/// │ Index block size (4B)                │
/// │ Magic number (8B)                    │
/// └──────────────────────────────────────┘
/// ```
///
/// A zero-size meta-index handle means the table has no meta blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub meta_index_handle: BlockHandle,
    pub index_handle: BlockHandle,
}

impl Footer {
    /// Size of the footer in bytes (fixed).
    pub const SIZE: usize = BlockHandle::SIZE * 2 + 8; // 24 bytes

    /// Encode footer to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.meta_index_handle.encode());
        buf.extend_from_slice(&self.index_handle.encode());
        buf.extend_from_slice(&SSTABLE_MAGIC.to_le_bytes());
        buf
    }

    /// Decode footer from bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TableTooShort(data.len() as u64));
        }
        let meta_index_handle = BlockHandle::decode(&data[0..8])?;
        let index_handle = BlockHandle::decode(&data[8..16])?;
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[16..24]);
        let magic = u64::from_le_bytes(magic);

        if magic != SSTABLE_MAGIC {
            return Err(Error::BadMagic(magic));
        }

        Ok(Footer {
            meta_index_handle,
            index_handle,
        })
    }
}
