//! Primary-key byte encoding and shard assignment.
//!
//! A stored row is keyed by the byte encoding of its primary key:
//! `partition_bytes ++ "|" ++ sort_bytes` when the schema has a sort key,
//! else just `partition_bytes`. The encoding is not injective when a key
//! value itself contains `|`; this is preserved for compatibility with the
//! original wire behavior (a length-prefixed encoding would fix it, but
//! would silently change pagination tokens).

use baddb_model::types::KeySchema;
use baddb_model::{AttributeValue, Entry};

/// Separator byte between the partition and sort components.
pub const KEY_SEPARATOR: u8 = b'|';

/// Number of shard buckets rows are hashed into for parallel scans.
pub const SHARD_BUCKETS: u32 = 1_000_000;

/// A primary key as stored: partition bytes plus optional sort bytes.
///
/// `sort` is `Some` exactly when the owning schema has a sort key; a missing
/// index sort attribute is represented as `Some` of empty bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// Encoded partition-key bytes.
    pub partition: Vec<u8>,
    /// Encoded sort-key bytes, when the schema has a sort key.
    pub sort: Option<Vec<u8>>,
}

impl PrimaryKey {
    /// Builds a key from already-encoded components.
    #[must_use]
    pub fn new(partition: Vec<u8>, sort: Option<Vec<u8>>) -> Self {
        Self { partition, sort }
    }

    /// Extracts the primary key from an entry per the given schema.
    ///
    /// Returns `None` when the partition attribute (or the sort attribute,
    /// for a schema that has one) is missing or not key-encodable.
    #[must_use]
    pub fn from_entry(
        partition_key: &KeySchema,
        sort_key: Option<&KeySchema>,
        entry: &Entry,
    ) -> Option<Self> {
        let partition = entry
            .get(&partition_key.attribute_name)
            .and_then(AttributeValue::key_bytes)?;
        let sort = match sort_key {
            Some(sk) => Some(entry.get(&sk.attribute_name).and_then(AttributeValue::key_bytes)?),
            None => None,
        };
        Some(Self { partition, sort })
    }

    /// Returns the canonical byte encoding used as the row key.
    #[must_use]
    pub fn encoded(&self) -> Vec<u8> {
        match &self.sort {
            Some(sort) => {
                let mut out = Vec::with_capacity(self.partition.len() + 1 + sort.len());
                out.extend_from_slice(&self.partition);
                out.push(KEY_SEPARATOR);
                out.extend_from_slice(sort);
                out
            }
            None => self.partition.clone(),
        }
    }

    /// Returns the shard bucket this key's partition hashes into.
    #[must_use]
    pub fn shard_id(&self) -> u32 {
        shard_id(&self.partition)
    }
}

/// Extracts and validates the primary key of an entry against a schema:
/// the attribute must be present, of the declared scalar type, and encode
/// to non-empty bytes.
///
/// # Errors
///
/// Returns `BaddbError::Validation` naming the offending attribute.
pub fn validated_key(
    partition_key: &KeySchema,
    sort_key: Option<&KeySchema>,
    entry: &Entry,
) -> crate::error::BaddbResult<PrimaryKey> {
    let partition = validated_component(partition_key, entry)?;
    let sort = match sort_key {
        Some(schema) => Some(validated_component(schema, entry)?),
        None => None,
    };
    Ok(PrimaryKey::new(partition, sort))
}

fn validated_component(
    schema: &KeySchema,
    entry: &Entry,
) -> crate::error::BaddbResult<Vec<u8>> {
    use crate::error::BaddbError;

    let value = entry.get(&schema.attribute_name).ok_or_else(|| {
        BaddbError::validation(format!(
            "missing key attribute: {}",
            schema.attribute_name
        ))
    })?;
    if !schema.attribute_type.matches(value) {
        return Err(BaddbError::validation(format!(
            "key attribute '{}' must be of type {}, found {}",
            schema.attribute_name,
            schema.attribute_type,
            value.type_descriptor()
        )));
    }
    let bytes = value.key_bytes().ok_or_else(|| {
        BaddbError::validation(format!(
            "key attribute '{}' is not key-encodable",
            schema.attribute_name
        ))
    })?;
    if bytes.is_empty() {
        return Err(BaddbError::validation(format!(
            "key attribute '{}' must not be empty",
            schema.attribute_name
        )));
    }
    Ok(bytes)
}

/// Assigns a partition to a stable shard bucket via 32-bit FNV-1a.
#[must_use]
pub fn shard_id(partition: &[u8]) -> u32 {
    fnv1a_32(partition) % SHARD_BUCKETS
}

/// 32-bit FNV-1a over the given bytes.
fn fnv1a_32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 2_166_136_261;
    const PRIME: u32 = 16_777_619;

    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
