// SSTable tests
// Blocks, table files, the footer and the two-level iterator.

use std::sync::Arc;

use lsmkv::config::Options;
use lsmkv::iterator::{ReversibleIterator, StorageIterator};
use lsmkv::sstable::block::{Block, BlockBuilder};
use lsmkv::sstable::{Footer, SSTable, TableBuilder};
use lsmkv::{Error, InternalKey, LookupResult, ValueType};
use tempfile::tempdir;

fn put(seq: u64, key: &str, value: &str) -> InternalKey {
    InternalKey::new(seq, ValueType::Value, key.into(), value.into())
}

fn build_table(path: &std::path::Path, options: &Options, keys: &[InternalKey]) -> u64 {
    let mut builder = TableBuilder::new(path, options).unwrap();
    for key in keys {
        builder.add(key).unwrap();
    }
    builder.finish().unwrap()
}

// =============================================================================
// Test 1: Block builder → block decode preserves every entry
// =============================================================================
#[test]
fn block_roundtrip() {
    let mut builder = BlockBuilder::new(4096);
    let keys: Vec<_> = (0..50).map(|i| put(i, &format!("key{i:03}"), "v")).collect();
    for key in &keys {
        assert!(builder.add(key));
    }
    let block = Block::decode(&builder.finish()).unwrap();
    assert_eq!(block.items(), keys.as_slice());
    assert!(builder.is_empty());
}

// =============================================================================
// Test 2: A full block refuses entries, but never the first one
// =============================================================================
#[test]
fn block_size_limit() {
    let big = put(1, "big", &"x".repeat(100));
    let mut builder = BlockBuilder::new(64);
    assert!(builder.add(&big));
    assert!(!builder.add(&put(2, "c", "v")));
    assert_eq!(builder.len(), 1);

    builder.reset();
    assert!(builder.is_empty());
    assert_eq!(builder.estimated_size(), 4);
}

// =============================================================================
// Test 3: Seeking past the last key invalidates the block cursor
// =============================================================================
#[test]
fn block_seek_past_end() {
    let mut builder = BlockBuilder::new(4096);
    for key in ["a", "c", "e"] {
        builder.add(&put(1, key, "v"));
    }
    let block = Arc::new(Block::decode(&builder.finish()).unwrap());
    let mut it = block.iter();

    it.seek(b"b").unwrap();
    assert_eq!(it.internal_key().user_key, b"c");
    it.seek(b"e").unwrap();
    assert_eq!(it.internal_key().user_key, b"e");
    it.seek(b"f").unwrap();
    assert!(!it.valid());

    it.seek_to_last().unwrap();
    it.prev().unwrap();
    assert_eq!(it.internal_key().user_key, b"c");
}

// =============================================================================
// Test 4: Point lookups distinguish values, tombstones and absent keys
// =============================================================================
#[test]
fn table_get_outcomes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");
    build_table(
        &path,
        &Options::default(),
        &[
            put(4, "apple", "red"),
            InternalKey::new(7, ValueType::Deletion, b"banana".to_vec(), Vec::new()),
            put(3, "banana", "yellow"),
            put(5, "cherry", "dark"),
        ],
    );

    let table = SSTable::open(&path).unwrap();
    assert_eq!(table.get(b"apple").unwrap(), LookupResult::Value(b"red".to_vec()));
    assert_eq!(table.get(b"banana").unwrap(), LookupResult::Deletion);
    assert_eq!(table.get(b"blueberry").unwrap(), LookupResult::NotFound);
    assert_eq!(table.get(b"zucchini").unwrap(), LookupResult::NotFound);
}

// =============================================================================
// Test 5: Table iterator walks every block both ways and seeks
// =============================================================================
#[test]
fn table_iterator_spans_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");
    let options = Options {
        block_size: 200,
        ..Options::default()
    };
    let keys: Vec<_> = (0..1000)
        .map(|i| put(i + 1, &format!("key{i:05}"), &format!("value{i}")))
        .collect();
    build_table(&path, &options, &keys);

    let table = Arc::new(SSTable::open(&path).unwrap());
    let mut it = table.iter();
    it.seek_to_first().unwrap();
    let mut forward = Vec::new();
    while it.valid() {
        forward.push(it.internal_key().clone());
        it.next().unwrap();
    }
    assert_eq!(forward, keys);

    it.seek_to_last().unwrap();
    let mut count = 0;
    while it.valid() {
        count += 1;
        it.prev().unwrap();
    }
    assert_eq!(count, 1000);

    it.seek(b"key00500x").unwrap();
    assert_eq!(it.internal_key().user_key, b"key00501");
    it.seek(b"key00999").unwrap();
    assert!(it.valid());
    it.next().unwrap();
    assert!(!it.valid());
    it.seek(b"zzz").unwrap();
    assert!(!it.valid());
}

// =============================================================================
// Test 6: The footer sits at the very end of the file
// =============================================================================
#[test]
fn footer_at_end_of_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");
    let size = build_table(&path, &Options::default(), &[put(1, "a", "1")]);

    let data = std::fs::read(&path).unwrap();
    assert_eq!(data.len() as u64, size);
    let footer = Footer::decode(&data[data.len() - Footer::SIZE..]).unwrap();
    assert_eq!(footer.index_handle.end(), size - Footer::SIZE as u64);
    assert_eq!(&data[data.len() - 8..], &0x0000141e36d08385u64.to_le_bytes());
}

// =============================================================================
// Test 7: Files that are too short or carry the wrong magic are rejected
// =============================================================================
#[test]
fn open_rejects_foreign_files() {
    let dir = tempdir().unwrap();

    let empty = dir.path().join("empty.sst");
    std::fs::write(&empty, b"").unwrap();
    assert!(matches!(SSTable::open(&empty), Err(Error::TableTooShort(0))));

    let path = dir.path().join("t.sst");
    build_table(&path, &Options::default(), &[put(1, "a", "1")]);
    let mut data = std::fs::read(&path).unwrap();
    let n = data.len();
    data[n - 1] ^= 0xFF;
    std::fs::write(&path, &data).unwrap();
    assert!(matches!(SSTable::open(&path), Err(Error::BadMagic(_))));

    assert!(matches!(
        SSTable::open(&dir.path().join("missing.sst")),
        Err(Error::Io(_))
    ));
}

// =============================================================================
// Test 8: Tables with a bloom filter answer exactly like plain tables
// =============================================================================
#[test]
fn filtered_table_matches_plain_table() {
    let dir = tempdir().unwrap();
    let keys: Vec<_> = (0..500)
        .map(|i| put(i + 1, &format!("user{:04}", i * 2), "v"))
        .collect();

    let plain_path = dir.path().join("plain.sst");
    let filtered_path = dir.path().join("filtered.sst");
    build_table(&plain_path, &Options::default(), &keys);
    build_table(
        &filtered_path,
        &Options {
            bloom_false_positive_rate: Some(0.01),
            ..Options::default()
        },
        &keys,
    );

    let plain = SSTable::open(&plain_path).unwrap();
    let filtered = SSTable::open(&filtered_path).unwrap();
    assert!(filtered.has_filter());
    assert!(filtered.file_size() > plain.file_size());
    for i in 0..1000 {
        let key = format!("user{i:04}");
        assert_eq!(
            plain.get(key.as_bytes()).unwrap(),
            filtered.get(key.as_bytes()).unwrap(),
            "{key}"
        );
    }
}
