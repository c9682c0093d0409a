//! Cache-scoped entry keys for the LMDB entry store.
//!
//! A `CacheScopedKey` can only be built from a cache id and a record number,
//! so every stored entry is addressed inside exactly one generation. The
//! binary form sorts by cache first and record number second, which turns
//! "entries of a cache ordered by RecordNumber" into a plain prefix scan.

use taxsync_core::{CacheId, EntityIdType, RecordNumber};
use uuid::Uuid;

/// Separator byte between cache_id and the record number.
const SEPARATOR: u8 = 0xFF;

/// Encoded key length: 16 (cache) + 1 (separator) + 8 (record number).
pub const KEY_LEN: usize = 25;

/// Prefix length shared by all keys of one cache.
pub const PREFIX_LEN: usize = 17;

/// A storage key addressing one entry position inside one cache generation.
///
/// # Binary Format
///
/// - Bytes 0-15: cache_id (UUID as bytes)
/// - Byte 16: separator (0xFF)
/// - Bytes 17-24: record number, big-endian with the sign bit flipped
///
/// Flipping the sign bit keeps byte order equal to numeric order for
/// negative record numbers too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheScopedKey {
    cache_id: CacheId,
    record_number: RecordNumber,
}

impl CacheScopedKey {
    pub fn new(cache_id: CacheId, record_number: RecordNumber) -> Self {
        Self {
            cache_id,
            record_number,
        }
    }

    pub fn cache_id(&self) -> CacheId {
        self.cache_id
    }

    pub fn record_number(&self) -> RecordNumber {
        self.record_number
    }

    pub fn encode(&self) -> [u8; KEY_LEN] {
        let mut bytes = [0u8; KEY_LEN];
        bytes[0..16].copy_from_slice(self.cache_id.as_uuid().as_bytes());
        bytes[16] = SEPARATOR;
        bytes[17..25].copy_from_slice(&encode_record_number(self.record_number));
        bytes
    }

    /// Decode a key from bytes.
    ///
    /// Returns `None` if the slice has the wrong length or the separator
    /// byte is missing.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_LEN || bytes[16] != SEPARATOR {
            return None;
        }

        let cache_id = Uuid::from_slice(&bytes[0..16]).ok()?;
        let record_bytes: [u8; 8] = bytes[17..25].try_into().ok()?;

        Some(Self {
            cache_id: CacheId::new(cache_id),
            record_number: decode_record_number(record_bytes),
        })
    }

    /// Prefix shared by every key of `cache_id`.
    pub fn cache_prefix(cache_id: CacheId) -> [u8; PREFIX_LEN] {
        let mut prefix = [0u8; PREFIX_LEN];
        prefix[0..16].copy_from_slice(cache_id.as_uuid().as_bytes());
        prefix[16] = SEPARATOR;
        prefix
    }
}

fn encode_record_number(record_number: RecordNumber) -> [u8; 8] {
    ((record_number as u64) ^ (1 << 63)).to_be_bytes()
}

fn decode_record_number(bytes: [u8; 8]) -> RecordNumber {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let key = CacheScopedKey::new(CacheId::now_v7(), 1234);
        let decoded = CacheScopedKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(CacheScopedKey::decode(&[0u8; 10]).is_none());

        let mut bytes = CacheScopedKey::new(CacheId::now_v7(), 1).encode();
        bytes[16] = 0x00;
        assert!(CacheScopedKey::decode(&bytes).is_none());
    }

    #[test]
    fn test_byte_order_follows_record_order() {
        let cache_id = CacheId::now_v7();
        let numbers = [-5i64, -1, 0, 1, 2, 255, 256, i64::MAX];
        let encoded: Vec<_> = numbers
            .iter()
            .map(|n| CacheScopedKey::new(cache_id, *n).encode())
            .collect();

        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(sorted, encoded);
    }

    #[test]
    fn test_prefix_matches_keys_of_same_cache_only() {
        let cache_a = CacheId::now_v7();
        let cache_b = CacheId::now_v7();
        let prefix = CacheScopedKey::cache_prefix(cache_a);

        assert!(CacheScopedKey::new(cache_a, 7).encode().starts_with(&prefix));
        assert!(!CacheScopedKey::new(cache_b, 7).encode().starts_with(&prefix));
    }
}
