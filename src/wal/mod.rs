pub mod reader;
pub mod record;
pub mod writer;

pub use reader::WALReader;
pub use record::WALRecord;
pub use writer::{WALManager, WALWriter};

/// Controls when the WAL is fsync'd to disk.
///
/// Trade-off: durability vs throughput.
///   - EveryWrite: zero data loss, ~10x slower (each fsync waits for disk)
///   - EveryNWrites: batched durability, lose up to N writes on crash
///   - EveryNMillis: bounded loss window, much higher throughput
///
/// Every policy still hands each record to the OS before the write returns,
/// so only a machine crash (not a process crash) can lose unsynced records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every record. Safest, slowest.
    EveryWrite,
    /// fsync every N records. Batched durability.
    EveryNWrites(usize),
    /// fsync on the first write at least N ms after the previous sync.
    EveryNMillis(u64),
}
