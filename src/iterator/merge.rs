use std::cmp::Ordering;

use crate::error::Result;
use crate::iterator::StorageIterator;
use crate::types::InternalKey;

/// Merges multiple sorted iterators into a single sorted stream.
///
/// Used by compaction to merge the input tables of both levels.
///
/// Ordering guarantee: entries are yielded in InternalKey order
/// (user_key ASC, sequence DESC). Nothing is dropped here; callers that
/// want only the newest version of each user key skip the rest themselves.
///
/// The smallest child is found by a linear scan, which beats a heap for
/// the handful of inputs a compaction has. When two children sit on equal
/// keys the one with the lower index wins.
pub struct MergingIterator<'a> {
    children: Vec<Box<dyn StorageIterator + 'a>>,
    current: Option<usize>,
}

impl<'a> MergingIterator<'a> {
    /// Create a new MergingIterator from sorted sources. The iterator starts
    /// unpositioned, like its children.
    pub fn new(children: Vec<Box<dyn StorageIterator + 'a>>) -> Self {
        MergingIterator {
            children,
            current: None,
        }
    }

    fn find_smallest(&mut self) {
        let mut smallest: Option<usize> = None;
        for (i, child) in self.children.iter().enumerate() {
            if !child.valid() {
                continue;
            }
            smallest = match smallest {
                Some(s)
                    if self.children[s].internal_key().cmp(child.internal_key())
                        != Ordering::Greater =>
                {
                    Some(s)
                }
                _ => Some(i),
            };
        }
        self.current = smallest;
    }
}

impl StorageIterator for MergingIterator<'_> {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn internal_key(&self) -> &InternalKey {
        match self.current {
            Some(i) => self.children[i].internal_key(),
            None => panic!("MergingIterator::internal_key called on an invalid iterator"),
        }
    }

    fn next(&mut self) -> Result<()> {
        if let Some(i) = self.current {
            self.children[i].next()?;
            self.find_smallest();
        }
        Ok(())
    }

    fn seek_to_first(&mut self) -> Result<()> {
        for child in &mut self.children {
            child.seek_to_first()?;
        }
        self.find_smallest();
        Ok(())
    }

    fn seek(&mut self, user_key: &[u8]) -> Result<()> {
        for child in &mut self.children {
            child.seek(user_key)?;
        }
        self.find_smallest();
        Ok(())
    }
}
