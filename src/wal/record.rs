use crate::error::{Error, Result};
use crate::types::ValueType;

/// A single record in the WAL: one put or delete with its sequence number.
///
/// On-disk format:
/// ```text
/// ┌──────────┬────────┬──────────┬──────────┬────────────┬───────────┬───────────┐
/// │ CRC (4B) │ Len(4B)│ Seq (8B) │ Type(1B) │ Key Len(4B)│ Key (var) │ Val (var) │
/// └──────────┴────────┴──────────┴──────────┴────────────┴───────────┴───────────┘
/// ```
///
/// Len counts the bytes after itself. CRC covers everything after the CRC
/// field itself. If CRC doesn't match on read, the record was a partial
/// write (crash mid-write) and recovery stops here; all preceding records
/// are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WALRecord {
    pub sequence: u64,
    pub value_type: ValueType,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// Header sizes
const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const SEQ_SIZE: usize = 8;
const TYPE_SIZE: usize = 1;
const KEY_LEN_SIZE: usize = 4;
const PAYLOAD_HEADER_SIZE: usize = SEQ_SIZE + TYPE_SIZE + KEY_LEN_SIZE;
const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE + PAYLOAD_HEADER_SIZE;

impl WALRecord {
    /// Create a Put record.
    pub fn put(sequence: u64, key: &[u8], value: &[u8]) -> Self {
        WALRecord {
            sequence,
            value_type: ValueType::Value,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    /// Create a Delete record.
    pub fn delete(sequence: u64, key: &[u8]) -> Self {
        WALRecord {
            sequence,
            value_type: ValueType::Deletion,
            key: key.to_vec(),
            value: Vec::new(),
        }
    }

    /// Serialize this record to bytes (including CRC header).
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = PAYLOAD_HEADER_SIZE + self.key.len() + self.value.len();
        let mut buf = Vec::with_capacity(CRC_SIZE + LEN_SIZE + payload_len);

        // Reserve space for CRC (we'll fill it at the end)
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.extend_from_slice(&(payload_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.push(self.value_type as u8);
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserialize the record at the front of `data`.
    /// Returns the record and the number of bytes it occupied.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Eof);
        }

        let stored_crc = le_u32(&data[0..4]);
        let payload_len = le_u32(&data[4..8]) as usize;
        if payload_len < PAYLOAD_HEADER_SIZE {
            return Err(Error::Corruption(format!(
                "record payload length {payload_len} shorter than its header"
            )));
        }
        let total_len = CRC_SIZE + LEN_SIZE + payload_len;
        if data.len() < total_len {
            return Err(Error::Eof);
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let mut offset = CRC_SIZE + LEN_SIZE;
        let mut sequence = [0u8; SEQ_SIZE];
        sequence.copy_from_slice(&data[offset..offset + SEQ_SIZE]);
        offset += SEQ_SIZE;

        let value_type = ValueType::from_u8(data[offset])?;
        offset += TYPE_SIZE;

        let key_len = le_u32(&data[offset..offset + KEY_LEN_SIZE]) as usize;
        offset += KEY_LEN_SIZE;
        if key_len > total_len - offset {
            return Err(Error::Corruption("key length exceeds record".into()));
        }
        let key = data[offset..offset + key_len].to_vec();
        offset += key_len;

        // Value is the rest of the record
        let value = data[offset..total_len].to_vec();

        Ok((
            WALRecord {
                sequence: u64::from_le_bytes(sequence),
                value_type,
                key,
                value,
            },
            total_len,
        ))
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}
