pub mod merge;

pub use merge::MergingIterator;

use crate::error::Result;
use crate::types::InternalKey;

/// The central iteration abstraction for the storage engine.
///
/// Every sorted data source (memtable, block, SSTable, merged view)
/// implements this trait. This enables composability: MergingIterator
/// takes `Vec<Box<dyn StorageIterator>>` and merges them.
///
/// Entries come out in InternalKey order: user key ascending, newest
/// version first.
pub trait StorageIterator {
    /// Returns true if the iterator is positioned at a valid entry.
    fn valid(&self) -> bool;

    /// Returns the current entry. Only valid when valid() is true.
    fn internal_key(&self) -> &InternalKey;

    /// Advances to the next entry. Returns error on IO failure.
    fn next(&mut self) -> Result<()>;

    /// Positions the iterator at the first entry.
    fn seek_to_first(&mut self) -> Result<()>;

    /// Positions the iterator at the newest entry whose user key >= target.
    fn seek(&mut self, user_key: &[u8]) -> Result<()>;
}

/// A source that can also be walked backwards.
pub trait ReversibleIterator: StorageIterator {
    /// Steps back one entry; stepping back from the first entry invalidates.
    fn prev(&mut self) -> Result<()>;

    /// Positions the iterator at the last entry.
    fn seek_to_last(&mut self) -> Result<()>;
}
