use crate::wal::SyncPolicy;

/// Level-0 compaction is started when we hit this many files.
pub const L0_COMPACTION_TRIGGER: usize = 4;

/// Soft limit on number of level-0 files. We slow down writes at this point.
pub const L0_SLOWDOWN_WRITES_TRIGGER: usize = 8;

/// Amount of data to build up in memory (backed by the WAL on disk) before
/// converting to a sorted on-disk file.
pub const WRITE_BUFFER_SIZE: usize = 4 << 20;

pub const NUM_LEVELS: usize = 7;

pub const MAX_OPEN_FILES: usize = 1000;

/// File handles kept for the WAL, manifest and friends rather than tables.
pub const NUM_NON_TABLE_CACHE_FILES: usize = 10;

/// Deepest level a freshly flushed table may be pushed to.
pub const MAX_MEM_COMPACT_LEVEL: usize = 2;

/// Compaction rolls over to a new output file past this size.
pub const MAX_FILE_SIZE: u64 = 2 << 20;

/// Target data block size (matching OS page size / SSD block size).
pub const BLOCK_SIZE: usize = 4096;

/// Seek budget recorded for every new table. Persisted, not yet consulted.
pub const ALLOWED_SEEKS: u64 = 1 << 30;

/// Engine tunables. `Default` gives the standard configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Memtable size that triggers a rotation.
    pub write_buffer_size: usize,
    /// Level-0 file count that makes level 0 a compaction candidate.
    pub l0_compaction_trigger: usize,
    /// Level-0 file count at which each write is delayed by 1ms.
    pub l0_slowdown_writes_trigger: usize,
    /// Compaction output size limit.
    pub max_file_size: u64,
    /// Total open file budget; the table cache gets all but
    /// `NUM_NON_TABLE_CACHE_FILES` of it.
    pub max_open_files: usize,
    pub block_size: usize,
    pub sync_policy: SyncPolicy,
    /// When set, every table carries a bloom filter sized for this false
    /// positive rate. `None` keeps the plain table layout.
    pub bloom_false_positive_rate: Option<f64>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            write_buffer_size: WRITE_BUFFER_SIZE,
            l0_compaction_trigger: L0_COMPACTION_TRIGGER,
            l0_slowdown_writes_trigger: L0_SLOWDOWN_WRITES_TRIGGER,
            max_file_size: MAX_FILE_SIZE,
            max_open_files: MAX_OPEN_FILES,
            block_size: BLOCK_SIZE,
            sync_policy: SyncPolicy::EveryNWrites(1000),
            bloom_false_positive_rate: None,
        }
    }
}

impl Options {
    /// Capacity of the table cache.
    pub fn table_cache_capacity(&self) -> usize {
        self.max_open_files
            .saturating_sub(NUM_NON_TABLE_CACHE_FILES)
            .max(1)
    }
}

/// Byte budget of a level before it becomes a compaction candidate.
///
/// The result for level zero is not really used since level 0 is scored by
/// file count.
pub fn max_bytes_for_level(level: usize) -> f64 {
    // Result for both level-0 and level-1
    let mut result = 10.0 * 1048576.0;
    let mut level = level;
    while level > 1 {
        result *= 10.0;
        level -= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_budgets_grow_tenfold() {
        assert_eq!(max_bytes_for_level(0), 10.0 * 1048576.0);
        assert_eq!(max_bytes_for_level(1), 10.0 * 1048576.0);
        assert_eq!(max_bytes_for_level(2), 100.0 * 1048576.0);
        assert_eq!(max_bytes_for_level(4), 10_000.0 * 1048576.0);
    }

    #[test]
    fn table_cache_capacity_reserves_non_table_files() {
        let options = Options::default();
        assert_eq!(options.table_cache_capacity(), 990);

        let tiny = Options {
            max_open_files: 3,
            ..Options::default()
        };
        assert_eq!(tiny.table_cache_capacity(), 1);
    }
}
