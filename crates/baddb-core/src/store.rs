//! Ordered row store backing one table or one index.
//!
//! Rows live in a `BTreeMap` keyed by the encoded primary-key bytes, which
//! yields the scan order contract directly: scans walk rows in key-byte
//! order, and a query over one partition walks that partition's rows in
//! sort-byte order. Each row also carries its partition/sort components and
//! shard bucket so queries and parallel scans filter on the columns rather
//! than re-parsing the encoded key.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::key::{PrimaryKey, shard_id};
use crate::tuple::{EntryWrapper, Tuple};

/// A stored row: the primary-key columns plus the version history.
#[derive(Debug, Clone)]
pub struct Row {
    /// Encoded partition-key bytes.
    pub partition: Vec<u8>,
    /// Encoded sort-key bytes, when the owning schema has a sort key.
    pub sort: Option<Vec<u8>>,
    /// Stable shard bucket derived from the partition bytes.
    pub shard_id: u32,
    /// The version history for this key.
    pub tuple: Tuple,
}

/// The ordered row store for a single table or secondary index.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: BTreeMap<Vec<u8>, Row>,
}

impl RowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (including rows whose newest version is a tombstone).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up the row for an encoded key.
    #[must_use]
    pub fn get(&self, encoded_key: &[u8]) -> Option<&Row> {
        self.rows.get(encoded_key)
    }

    /// Appends a version to the row for `key`, creating the row on first
    /// write.
    pub fn push_version(&mut self, key: &PrimaryKey, wrapper: EntryWrapper) {
        let encoded = key.encoded();
        let row = self.rows.entry(encoded).or_insert_with(|| Row {
            partition: key.partition.clone(),
            sort: key.sort.clone(),
            shard_id: shard_id(&key.partition),
            tuple: Tuple::new(),
        });
        row.tuple.push(wrapper);
    }

    /// Appends a version to the row with an explicitly provided encoded key
    /// and key columns. Used by index stores, whose BTree key carries the
    /// base key as a suffix.
    pub fn push_version_keyed(
        &mut self,
        encoded_key: Vec<u8>,
        partition: Vec<u8>,
        sort: Option<Vec<u8>>,
        wrapper: EntryWrapper,
    ) {
        let shard = shard_id(&partition);
        let row = self.rows.entry(encoded_key).or_insert_with(|| Row {
            partition,
            sort,
            shard_id: shard,
            tuple: Tuple::new(),
        });
        row.tuple.push(wrapper);
    }

    /// Returns `true` if a row exists for the encoded key.
    #[must_use]
    pub fn contains(&self, encoded_key: &[u8]) -> bool {
        self.rows.contains_key(encoded_key)
    }

    /// Iterates all rows in ascending key-byte order, together with their
    /// encoded keys.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Vec<u8>, &Row)> {
        self.rows.iter()
    }

    /// Iterates rows strictly after the given encoded key, ascending.
    pub fn iter_after<'a>(
        &'a self,
        start: &[u8],
    ) -> impl DoubleEndedIterator<Item = (&'a Vec<u8>, &'a Row)> {
        self.rows
            .range::<[u8], _>((Bound::Excluded(start), Bound::Unbounded))
    }

    /// Iterates rows strictly before the given encoded key, descending.
    pub fn iter_before<'a>(
        &'a self,
        start: &[u8],
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Row)> {
        self.rows
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(start)))
            .rev()
    }

    /// Iterates the rows of a single partition in ascending sort-byte order.
    pub fn partition_rows<'a>(
        &'a self,
        partition: &'a [u8],
    ) -> impl DoubleEndedIterator<Item = (&'a Vec<u8>, &'a Row)> {
        self.rows
            .iter()
            .filter(move |(_, row)| row.partition == partition)
    }
}
