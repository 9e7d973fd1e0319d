//! Immutable sorted table files.
//!
//! ```text
//! ┌──────────────────┐
//! │ Data block 0     │
//! │ ...              │
//! │ Data block N     │
//! ├──────────────────┤
//! │ Filter block     │  (only when bloom filters are enabled)
//! │ Meta-index block │  (only when bloom filters are enabled)
//! ├──────────────────┤
//! │ Index block      │
//! ├──────────────────┤
//! │ Footer (24B)     │
//! └──────────────────┘
//! ```

pub mod block;
pub mod builder;
pub mod footer;
pub mod iterator;
pub mod reader;

pub use builder::TableBuilder;
pub use footer::{BlockHandle, Footer, SSTABLE_MAGIC};
pub use iterator::SSTableIterator;
pub use reader::SSTable;

/// Meta-index key under which the bloom filter block is recorded.
pub const FILTER_META_KEY: &[u8] = b"filter.bloom";
