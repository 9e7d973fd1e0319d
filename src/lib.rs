//! # lsmkv
//!
//! An embedded key-value storage engine built on a leveled Log-Structured
//! Merge-Tree.
//!
//! ## Core idea
//! Writes go to a write-ahead log and an in-memory skip list. When the
//! memtable fills up it is frozen and flushed as an immutable sorted table
//! at level 0; a background thread merges tables down the levels so that
//! every level past 0 holds key-disjoint files and reads touch at most one
//! file per level.
//!
//! ```no_run
//! use lsmkv::{DB, LookupResult};
//!
//! let db = DB::open("/tmp/demo")?;
//! db.put(b"hello", b"world")?;
//! assert_eq!(db.get(b"hello")?, LookupResult::Value(b"world".to_vec()));
//! db.delete(b"hello")?;
//! assert_eq!(db.get(b"hello")?, LookupResult::Deletion);
//! db.close()?;
//! # Ok::<(), lsmkv::Error>(())
//! ```

pub mod bloom;
pub mod cache;
pub mod compaction;
pub mod config;
pub mod db;
pub mod error;
pub mod filename;
pub mod iterator;
pub mod manifest;
pub mod memtable;
pub mod sstable;
pub mod types;
pub mod version;
pub mod wal;

// Public re-exports for the top-level API
pub use config::Options;
pub use db::{DB, Stats};
pub use error::{Error, Result};
pub use types::{InternalKey, LookupResult, ValueType};
