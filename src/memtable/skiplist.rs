use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;

use crate::types::Comparator;

/// Maximum height of the skip list. LevelDB uses 12.
pub const MAX_HEIGHT: usize = 12;

/// Each level holds 1/BRANCHING of the nodes of the level below.
pub const BRANCHING: u32 = 4;

/// A single node in the skip list.
///
/// Each node has `height` forward pointers. Level 0 contains all nodes
/// (a regular linked list). Higher levels skip over nodes, enabling
/// O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
struct SkipNode<K> {
    key: Arc<K>,
    forward: Vec<Option<usize>>, // indices into Arena.nodes
}

/// Nodes live in an append-only arena and point forward by index, so the
/// structure is a DAG with no back pointers. Position `None` is the head.
struct Arena<K> {
    head: [Option<usize>; MAX_HEIGHT],
    nodes: Vec<SkipNode<K>>,
    height: usize,
}

impl<K> Arena<K> {
    fn next(&self, pos: Option<usize>, level: usize) -> Option<usize> {
        match pos {
            None => self.head[level],
            Some(idx) => self.nodes[idx].forward[level],
        }
    }

    fn set_next(&mut self, pos: Option<usize>, level: usize, next: Option<usize>) {
        match pos {
            None => self.head[level] = next,
            Some(idx) => self.nodes[idx].forward[level] = next,
        }
    }

    fn entry(&self, idx: usize) -> (usize, Arc<K>) {
        (idx, Arc::clone(&self.nodes[idx].key))
    }
}

/// A probabilistic sorted data structure, ordered by the comparator it was
/// built with.
///
/// Why skip list over red-black tree?
///   - Simpler to implement correctly
///   - Better cache locality for iteration (level 0 is a linked list)
///   - This is what LevelDB uses
///
/// Average case: O(log n) insert, O(log n) lookup, O(n) iteration.
///
/// The list owns a read-write lock: inserts take it exclusively, lookups and
/// every iterator step take it shared. Entries are never removed.
pub struct SkipList<K, C> {
    arena: RwLock<Arena<K>>,
    comparator: C,
}

impl<K, C: Comparator<K>> SkipList<K, C> {
    /// Create a new empty skip list.
    pub fn new(comparator: C) -> Self {
        SkipList {
            arena: RwLock::new(Arena {
                head: [None; MAX_HEIGHT],
                nodes: Vec::new(),
                height: 1,
            }),
            comparator,
        }
    }

    /// Insert a key. Equal keys are kept side by side; the list never
    /// overwrites.
    ///
    /// Algorithm:
    ///   1. Find the insertion point at each level (track predecessors)
    ///   2. Generate a random height for the new node
    ///   3. Splice into the list at each level up to the node's height
    pub fn insert(&self, key: K) {
        let mut arena = self.arena.write();
        let (_, mut prev) = self.find_greater_or_equal(&arena, &key);

        let height = random_height();
        if height > arena.height {
            for slot in prev.iter_mut().take(height).skip(arena.height) {
                *slot = None;
            }
            arena.height = height;
        }

        let idx = arena.nodes.len();
        let forward = (0..height).map(|level| arena.next(prev[level], level)).collect();
        arena.nodes.push(SkipNode {
            key: Arc::new(key),
            forward,
        });
        for (level, pos) in prev.iter().enumerate().take(height) {
            arena.set_next(*pos, level, Some(idx));
        }
    }

    /// Whether an entry comparing equal to `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        let arena = self.arena.read();
        match self.find_greater_or_equal(&arena, key).0 {
            Some(idx) => self.comparator.compare(&arena.nodes[idx].key, key) == Ordering::Equal,
            None => false,
        }
    }

    /// Number of entries in the skip list.
    pub fn len(&self) -> usize {
        self.arena.read().nodes.len()
    }

    /// Whether the skip list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create an unpositioned iterator.
    pub fn iter(&self) -> SkipListIterator<'_, K, C> {
        SkipListIterator {
            list: self,
            node: None,
        }
    }

    fn key_is_after_node(&self, arena: &Arena<K>, key: &K, node: Option<usize>) -> bool {
        match node {
            Some(idx) => self.comparator.compare(&arena.nodes[idx].key, key) == Ordering::Less,
            None => false,
        }
    }

    /// First node >= key, plus the predecessor at every level.
    fn find_greater_or_equal(
        &self,
        arena: &Arena<K>,
        key: &K,
    ) -> (Option<usize>, [Option<usize>; MAX_HEIGHT]) {
        let mut prev = [None; MAX_HEIGHT];
        let mut x = None;
        let mut level = arena.height - 1;
        loop {
            let next = arena.next(x, level);
            if self.key_is_after_node(arena, key, next) {
                x = next;
            } else {
                prev[level] = x;
                if level == 0 {
                    return (next, prev);
                }
                level -= 1;
            }
        }
    }

    /// Last node < key, or `None` (the head) if there is none.
    fn find_less_than(&self, arena: &Arena<K>, key: &K) -> Option<usize> {
        let mut x = None;
        let mut level = arena.height - 1;
        loop {
            match arena.next(x, level) {
                Some(next)
                    if self.comparator.compare(&arena.nodes[next].key, key) == Ordering::Less =>
                {
                    x = Some(next);
                }
                _ => {
                    if level == 0 {
                        return x;
                    }
                    level -= 1;
                }
            }
        }
    }

    fn find_last(&self, arena: &Arena<K>) -> Option<usize> {
        let mut x = None;
        let mut level = arena.height - 1;
        loop {
            match arena.next(x, level) {
                Some(next) => x = Some(next),
                None => {
                    if level == 0 {
                        return x;
                    }
                    level -= 1;
                }
            }
        }
    }
}

/// Generate a random level for a new node.
/// Each extra level has a 1/BRANCHING probability (LevelDB uses 1/4, not 1/2).
fn random_height() -> usize {
    let mut rng = rand::thread_rng();
    let mut height = 1;
    while height < MAX_HEIGHT && rng.gen_range(0..BRANCHING) == 0 {
        height += 1;
    }
    height
}

/// Cursor over skip list entries in sorted order.
///
/// Holds a shared handle to the current key, so the list lock is only taken
/// while moving.
pub struct SkipListIterator<'a, K, C> {
    list: &'a SkipList<K, C>,
    node: Option<(usize, Arc<K>)>,
}

impl<'a, K, C: Comparator<K>> SkipListIterator<'a, K, C> {
    /// Returns true iff the iterator is positioned at a valid node.
    pub fn valid(&self) -> bool {
        self.node.is_some()
    }

    /// Returns the key at the current position.
    ///
    /// # Panics
    /// Panics if the iterator is not valid.
    pub fn key(&self) -> &K {
        match &self.node {
            Some((_, key)) => key,
            None => panic!("SkipListIterator::key called on an invalid iterator"),
        }
    }

    /// Advances to the next position. No-op when invalid.
    pub fn next(&mut self) {
        if let Some((idx, _)) = self.node {
            let arena = self.list.arena.read();
            self.node = arena.nodes[idx].forward[0].map(|next| arena.entry(next));
        }
    }

    /// Retreats to the previous position. No-op when invalid.
    pub fn prev(&mut self) {
        let Some((_, key)) = self.node.take() else {
            return;
        };
        let arena = self.list.arena.read();
        self.node = self
            .list
            .find_less_than(&arena, &key)
            .map(|idx| arena.entry(idx));
    }

    /// Advance to the first entry with a key >= target.
    pub fn seek(&mut self, target: &K) {
        let arena = self.list.arena.read();
        self.node = self
            .list
            .find_greater_or_equal(&arena, target)
            .0
            .map(|idx| arena.entry(idx));
    }

    /// Position at the first entry in list.
    /// Final state of iterator is valid() iff list is not empty.
    pub fn seek_to_first(&mut self) {
        let arena = self.list.arena.read();
        self.node = arena.head[0].map(|idx| arena.entry(idx));
    }

    /// Position at the last entry in list.
    /// Final state of iterator is valid() iff list is not empty.
    pub fn seek_to_last(&mut self) {
        let arena = self.list.arena.read();
        self.node = self.list.find_last(&arena).map(|idx| arena.entry(idx));
    }
}
