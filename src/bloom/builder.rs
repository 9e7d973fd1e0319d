use crate::bloom::BloomFilter;

/// Convenience builder for constructing a bloom filter during SSTable creation.
///
/// The number of keys in a table is only known once the table is finished,
/// so keys are collected first and the filter is sized in `build`.
///
/// Usage during SSTable build:
/// 1. Create a BloomFilterBuilder with the target false positive rate
/// 2. Call add_key() for every user key written to the SSTable
/// 3. Call build() to get the final BloomFilter for serialization
pub struct BloomFilterBuilder {
    keys: Vec<Vec<u8>>,
    false_positive_rate: f64,
}

impl BloomFilterBuilder {
    pub fn new(false_positive_rate: f64) -> Self {
        BloomFilterBuilder {
            keys: Vec::new(),
            false_positive_rate,
        }
    }

    /// Add a key to the bloom filter being built. Consecutive duplicates
    /// (several versions of one user key) are stored once.
    pub fn add_key(&mut self, key: &[u8]) {
        if self.keys.last().map(Vec::as_slice) != Some(key) {
            self.keys.push(key.to_vec());
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Finalize and return the bloom filter.
    pub fn build(self) -> BloomFilter {
        let mut filter = BloomFilter::new(self.keys.len().max(1), self.false_positive_rate);
        for key in &self.keys {
            filter.insert(key);
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_dedups_consecutive_versions() {
        let mut builder = BloomFilterBuilder::new(0.01);
        builder.add_key(b"a");
        builder.add_key(b"a");
        builder.add_key(b"b");
        assert_eq!(builder.len(), 2);

        let filter = builder.build();
        assert!(filter.may_contain(b"a"));
        assert!(filter.may_contain(b"b"));
    }

    #[test]
    fn empty_builder_still_builds() {
        let filter = BloomFilterBuilder::new(0.01).build();
        assert!(!filter.may_contain(b"anything"));
    }
}
