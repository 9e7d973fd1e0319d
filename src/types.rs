use std::cmp::Ordering;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Raw key bytes.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// Sequence number used by lookup keys: sorts before every real version of
/// the same user key.
pub const MAX_SEQUENCE_NUMBER: u64 = u64::MAX;

/// Distinguishes puts from deletes in the storage engine.
/// A Deletion writes a tombstone. The key isn't removed, it's marked as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    /// A delete (tombstone marker).
    Deletion = 0x00,
    /// A normal put operation.
    Value = 0x01,
}

impl ValueType {
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(ValueType::Deletion),
            0x01 => Ok(ValueType::Value),
            _ => Err(Error::Corruption(format!("invalid value type: {byte}"))),
        }
    }
}

/// Outcome of a point lookup.
///
/// `Deletion` means the newest version of the key is a tombstone. Callers
/// must not treat it like `NotFound`: a deletion found at a shallow level
/// hides any older value at a deeper one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Value(Value),
    Deletion,
    NotFound,
}

impl LookupResult {
    /// Whether the lookup settled the key (found a value or a tombstone).
    pub fn is_resolved(&self) -> bool {
        !matches!(self, LookupResult::NotFound)
    }
}

/// Internal key format: sequence number + value type + user key + user value.
///
/// Ordering: (user_key ASC, sequence DESC).
/// This ensures the newest version of a key always comes first during merging.
///
/// The sequence number is a monotonically increasing counter assigned to each
/// write operation. It provides a total ordering of all writes.
///
/// Encoded form:
/// ```text
/// ┌──────────┬──────────┬─────────────┬───────────┬───────────────┬─────────────┐
/// │ Seq (8B) │ Type(1B) │ Key Len(4B) │ Key (var) │ Value Len(4B) │ Value (var) │
/// └──────────┴──────────┴─────────────┴───────────┴───────────────┴─────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalKey {
    pub sequence: u64,
    pub value_type: ValueType,
    pub user_key: Key,
    pub user_value: Value,
}

const FIXED_ENCODING_SIZE: usize = 8 + 1 + 4 + 4;

impl InternalKey {
    pub fn new(sequence: u64, value_type: ValueType, user_key: Key, user_value: Value) -> Self {
        InternalKey {
            sequence,
            value_type,
            user_key,
            user_value,
        }
    }

    /// Seek target for the newest version of `user_key` visible at `sequence`.
    pub fn lookup(user_key: &[u8], sequence: u64) -> Self {
        InternalKey::new(sequence, ValueType::Value, user_key.to_vec(), Vec::new())
    }

    /// Same key with the value dropped; what the file catalog stores.
    pub fn without_value(&self) -> Self {
        InternalKey::new(
            self.sequence,
            self.value_type,
            self.user_key.clone(),
            Vec::new(),
        )
    }

    /// Size of this key when serialized.
    pub fn encoded_len(&self) -> usize {
        FIXED_ENCODING_SIZE + self.user_key.len() + self.user_value.len()
    }

    pub fn encode_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.sequence.to_le_bytes())?;
        w.write_all(&[self.value_type as u8])?;
        w.write_all(&(self.user_key.len() as u32).to_le_bytes())?;
        w.write_all(&self.user_key)?;
        w.write_all(&(self.user_value.len() as u32).to_le_bytes())?;
        w.write_all(&self.user_value)?;
        Ok(())
    }

    /// Decode one key. Truncated input yields `Error::Eof`.
    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let sequence = read_u64(r)?;
        let mut type_buf = [0u8; 1];
        r.read_exact(&mut type_buf)?;
        let value_type = ValueType::from_u8(type_buf[0])?;
        let user_key = read_length_prefixed(r)?;
        let user_value = read_length_prefixed(r)?;
        Ok(InternalKey {
            sequence,
            value_type,
            user_key,
            user_value,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        // Writing into a Vec cannot fail.
        let _ = self.encode_to(&mut buf);
        buf
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        internal_key_compare(self, other)
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_length_prefixed<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u32(r)? as usize;
    // Read through `take` so a corrupt length can't force a huge allocation.
    let mut buf = Vec::new();
    r.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(Error::Eof);
    }
    Ok(buf)
}

/// Plain lexicographic byte comparison.
pub fn user_key_compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// User key ascending, then sequence descending, then value type descending.
pub fn internal_key_compare(a: &InternalKey, b: &InternalKey) -> Ordering {
    user_key_compare(&a.user_key, &b.user_key)
        .then_with(|| b.sequence.cmp(&a.sequence))
        .then_with(|| b.value_type.cmp(&a.value_type))
}

/// Total order over `K`, fixed when an ordered container is built.
pub trait Comparator<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The ordering shared by the memtable, blocks and the level invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct InternalKeyComparator;

impl Comparator<InternalKey> for InternalKeyComparator {
    fn compare(&self, a: &InternalKey, b: &InternalKey) -> Ordering {
        internal_key_compare(a, b)
    }
}
