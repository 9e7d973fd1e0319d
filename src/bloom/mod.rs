pub mod builder;

use xxhash_rust::xxh3::xxh3_128;

use crate::error::{Error, Result};

pub use builder::BloomFilterBuilder;

/// Set-membership filter over the user keys of one table.
///
/// A clear hashed bit proves the key was never added; all bits set means it
/// probably was. When enabled through `Options::bloom_false_positive_rate`,
/// point lookups consult the filter before reading any data block.
///
/// Sizing for `n` keys at false positive rate `p`:
///   bits   = n * -log2(p) / ln(2)
///   hashes = bits / n * ln(2)
///
/// Bit positions come from one xxh3-128 hash split into two halves
/// (`h1 + i * h2`), so a key is hashed once no matter how many bits it sets.
pub struct BloomFilter {
    bits: Vec<u64>,
    num_hashes: u32,
    num_bits: u32,
}

impl BloomFilter {
    /// An empty filter sized for `expected_items` keys.
    ///
    /// Out-of-range arguments are clamped: at least one item, and a rate
    /// inside `[1e-9, 0.5]`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let items = expected_items.max(1) as f64;
        let rate = false_positive_rate.clamp(1e-9, 0.5);

        let bits_per_key = -rate.log2() / std::f64::consts::LN_2;
        let num_bits = ((items * bits_per_key).ceil() as u32).max(64);
        let num_hashes = ((bits_per_key * std::f64::consts::LN_2).round() as u32).clamp(1, 30);

        Self {
            bits: vec![0u64; (num_bits as usize).div_ceil(64)],
            num_hashes,
            num_bits,
        }
    }

    pub fn insert(&mut self, key: &[u8]) {
        for pos in self.bit_positions(key) {
            self.bits[pos / 64] |= 1 << (pos % 64);
        }
    }

    /// `false` means the key is definitely absent.
    pub fn may_contain(&self, key: &[u8]) -> bool {
        self.bit_positions(key)
            .all(|pos| self.bits[pos / 64] & (1 << (pos % 64)) != 0)
    }

    /// Serialize the bloom filter to bytes (for writing into SSTable).
    ///
    /// ```text
    /// [num_hashes (4B)][num_bits (4B)][bit words (8B each, LE)]
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.bits.len() * 8);
        buf.extend_from_slice(&self.num_hashes.to_le_bytes());
        buf.extend_from_slice(&self.num_bits.to_le_bytes());
        for word in &self.bits {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        buf
    }

    /// Deserialize a bloom filter from bytes (when opening an SSTable).
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Corruption(format!(
                "bloom filter too short: {} bytes",
                data.len()
            )));
        }
        let (header, words) = data.split_at(8);
        let mut num_hashes = [0u8; 4];
        let mut num_bits = [0u8; 4];
        num_hashes.copy_from_slice(&header[..4]);
        num_bits.copy_from_slice(&header[4..]);
        let num_hashes = u32::from_le_bytes(num_hashes);
        let num_bits = u32::from_le_bytes(num_bits);

        let num_u64s = (num_bits as usize).div_ceil(64);
        if num_bits == 0 || num_hashes == 0 || words.len() != num_u64s * 8 {
            return Err(Error::Corruption(format!(
                "bloom filter header ({num_hashes} hashes, {num_bits} bits) \
                 does not match {} payload bytes",
                words.len()
            )));
        }

        let bits = words
            .chunks_exact(8)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();

        Ok(Self {
            bits,
            num_hashes,
            num_bits,
        })
    }

    /// Get the number of hash functions used.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Get the total number of bits in the filter.
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Bit positions hashed for `key`.
    fn bit_positions(&self, key: &[u8]) -> impl Iterator<Item = usize> + use<> {
        let hash = xxh3_128(key);
        let (h1, h2) = (hash as u64, (hash >> 64) as u64);
        let num_bits = u64::from(self.num_bits);
        (0..u64::from(self.num_hashes))
            .map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % num_bits) as usize)
    }
}
