// Skip list tests
// Ordering, duplicates, cursor movement and concurrent inserts.

use std::cmp::Ordering;
use std::sync::Arc;
use std::thread;

use lsmkv::memtable::skiplist::SkipList;
use lsmkv::types::Comparator;
use rand::Rng;

struct IntComparator;

impl Comparator<i64> for IntComparator {
    fn compare(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }
}

fn collect(list: &SkipList<i64, IntComparator>) -> Vec<i64> {
    let mut out = Vec::new();
    let mut it = list.iter();
    it.seek_to_first();
    while it.valid() {
        out.push(*it.key());
        it.next();
    }
    out
}

// =============================================================================
// Test 1: Empty list
// =============================================================================
#[test]
fn empty_list_has_no_entries() {
    let list = SkipList::new(IntComparator);
    assert!(list.is_empty());
    assert_eq!(list.len(), 0);
    assert!(!list.contains(&1));

    let mut it = list.iter();
    assert!(!it.valid());
    it.seek_to_first();
    assert!(!it.valid());
    it.seek_to_last();
    assert!(!it.valid());
    it.seek(&10);
    assert!(!it.valid());
}

// =============================================================================
// Test 2: Random inserts come out sorted
// =============================================================================
#[test]
fn random_inserts_iterate_in_order() {
    let list = SkipList::new(IntComparator);
    let mut rng = rand::thread_rng();
    let mut expected = Vec::new();
    for _ in 0..2000 {
        let n = rng.gen_range(0..500);
        list.insert(n);
        expected.push(n);
    }
    expected.sort();

    assert_eq!(list.len(), 2000);
    assert_eq!(collect(&list), expected);
}

// =============================================================================
// Test 3: Duplicates are kept side by side
// =============================================================================
#[test]
fn duplicates_are_kept() {
    let list = SkipList::new(IntComparator);
    list.insert(5);
    list.insert(5);
    list.insert(3);
    assert_eq!(collect(&list), vec![3, 5, 5]);
    assert!(list.contains(&5));
    assert!(!list.contains(&4));
}

// =============================================================================
// Test 4: Seek lands on the first entry >= target
// =============================================================================
#[test]
fn seek_finds_lower_bound() {
    let list = SkipList::new(IntComparator);
    for n in (0..100).map(|i| i * 10) {
        list.insert(n);
    }

    let mut it = list.iter();
    it.seek(&35);
    assert_eq!(*it.key(), 40);
    it.seek(&40);
    assert_eq!(*it.key(), 40);
    it.seek(&-1);
    assert_eq!(*it.key(), 0);
    it.seek(&991);
    assert!(!it.valid());
}

// =============================================================================
// Test 5: Backward iteration mirrors forward iteration
// =============================================================================
#[test]
fn prev_walks_backwards() {
    let list = SkipList::new(IntComparator);
    for n in [7, 1, 9, 3, 5] {
        list.insert(n);
    }

    let mut it = list.iter();
    it.seek_to_last();
    let mut backward = Vec::new();
    while it.valid() {
        backward.push(*it.key());
        it.prev();
    }
    assert_eq!(backward, vec![9, 7, 5, 3, 1]);

    // Stepping back from the first entry invalidates.
    it.seek_to_first();
    it.prev();
    assert!(!it.valid());
}

// =============================================================================
// Test 6: Concurrent inserts keep the order invariant
// =============================================================================
#[test]
fn concurrent_inserts_stay_sorted() {
    let list = Arc::new(SkipList::new(IntComparator));
    let mut handles = vec![];

    for t in 0..8i64 {
        let list = Arc::clone(&list);
        handles.push(thread::spawn(move || {
            for i in 0..500 {
                list.insert(i * 8 + t);
            }
        }));
    }
    // A reader walks the list while writers are busy.
    let reader_list = Arc::clone(&list);
    let reader = thread::spawn(move || {
        for _ in 0..20 {
            let seen = collect(&reader_list);
            assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        }
    });

    for h in handles {
        h.join().unwrap();
    }
    reader.join().unwrap();

    let all = collect(&list);
    assert_eq!(all, (0..4000).collect::<Vec<_>>());
}

// =============================================================================
// Test 7: An iterator keeps its key while the list grows
// =============================================================================
#[test]
fn iterator_survives_later_inserts() {
    let list = SkipList::new(IntComparator);
    list.insert(10);
    list.insert(30);

    let mut it = list.iter();
    it.seek_to_first();
    assert_eq!(*it.key(), 10);

    list.insert(20);
    it.next();
    assert_eq!(*it.key(), 20);
}
