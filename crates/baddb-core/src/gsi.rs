//! Global secondary index row derivation and synchronization.
//!
//! Every base-table mutation mirrors into each GSI's backing store within
//! the same engine transaction. A GSI row is keyed by the index key bytes
//! suffixed with the base row's encoded key, which keeps rows for distinct
//! base items distinct even when they collide on the index key, and makes
//! index scans order by index partition, then index sort, then base key.

use baddb_model::types::{GlobalSecondaryIndexSetting, IndexProjection, KeySchema};
use baddb_model::{AttributeValue, Entry};

use crate::key::KEY_SEPARATOR;
use crate::store::RowStore;
use crate::table::TableMetadata;
use crate::tuple::EntryWrapper;

/// The storage key of a GSI row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsiRowKey {
    /// Encoded BTree key: index partition ++ `|` ++ index sort (if the index
    /// has a sort key) ++ `|` ++ base encoded key.
    pub encoded: Vec<u8>,
    /// Index partition bytes (empty when the attribute is missing).
    pub partition: Vec<u8>,
    /// Index sort bytes, when the index schema has a sort key (empty when
    /// the attribute is missing).
    pub sort: Option<Vec<u8>>,
}

/// Bytes of a key attribute in an entry; empty when the attribute is
/// missing or not key-encodable.
fn key_attribute_bytes(schema: &KeySchema, entry: &Entry) -> Vec<u8> {
    entry
        .get(&schema.attribute_name)
        .and_then(AttributeValue::key_bytes)
        .unwrap_or_default()
}

/// Derives the GSI row key for an entry.
#[must_use]
pub fn gsi_row_key(
    gsi: &GlobalSecondaryIndexSetting,
    entry: &Entry,
    base_encoded: &[u8],
) -> GsiRowKey {
    let partition = key_attribute_bytes(&gsi.partition_key, entry);
    let sort = gsi
        .sort_key
        .as_ref()
        .map(|schema| key_attribute_bytes(schema, entry));

    let mut encoded =
        Vec::with_capacity(partition.len() + sort.as_ref().map_or(0, Vec::len) + base_encoded.len() + 2);
    encoded.extend_from_slice(&partition);
    encoded.push(KEY_SEPARATOR);
    if let Some(sort) = &sort {
        encoded.extend_from_slice(sort);
        encoded.push(KEY_SEPARATOR);
    }
    encoded.extend_from_slice(base_encoded);

    GsiRowKey {
        encoded,
        partition,
        sort,
    }
}

/// Collects the base-key and index-key attributes present in an entry.
#[must_use]
pub fn key_attributes_entry(
    meta: &TableMetadata,
    gsi: &GlobalSecondaryIndexSetting,
    entry: &Entry,
) -> Entry {
    let mut out = Entry::new();
    let mut keep = vec![&meta.partition_key];
    if let Some(sort) = &meta.sort_key {
        keep.push(sort);
    }
    keep.push(&gsi.partition_key);
    if let Some(sort) = &gsi.sort_key {
        keep.push(sort);
    }
    for schema in keep {
        if let Some(value) = entry.get(&schema.attribute_name) {
            out.insert(schema.attribute_name.clone(), value.clone());
        }
    }
    out
}

/// Builds the projected index body of a live entry.
#[must_use]
pub fn project_entry(
    meta: &TableMetadata,
    gsi: &GlobalSecondaryIndexSetting,
    entry: &Entry,
) -> Entry {
    match &gsi.projection {
        IndexProjection::All => entry.clone(),
        IndexProjection::KeysOnly => key_attributes_entry(meta, gsi, entry),
        IndexProjection::Include(non_key_attributes) => {
            let mut out = key_attributes_entry(meta, gsi, entry);
            for name in non_key_attributes {
                if let Some(value) = entry.get(name) {
                    out.insert(name.clone(), value.clone());
                }
            }
            out
        }
    }
}

/// Mirrors one base-row mutation into a GSI store.
///
/// `previous` is the newest base version before the mutation; `wrapper` is
/// the version just written. When the index key moved, the old index row
/// receives a tombstone so stale reads age it out on the same clock.
pub fn mirror_mutation(
    meta: &TableMetadata,
    gsi: &GlobalSecondaryIndexSetting,
    store: &mut RowStore,
    base_encoded: &[u8],
    previous: Option<&EntryWrapper>,
    wrapper: &EntryWrapper,
) {
    let old_key = previous
        .filter(|p| !p.is_deleted)
        .map(|p| (gsi_row_key(gsi, &p.entry, base_encoded), &p.entry));

    if wrapper.is_deleted {
        if let Some((key, old_entry)) = old_key {
            let tombstone = EntryWrapper::tombstone(
                key_attributes_entry(meta, gsi, old_entry),
                wrapper.created_at,
            );
            push(store, &key, tombstone);
        }
        return;
    }

    let new_key = gsi_row_key(gsi, &wrapper.entry, base_encoded);

    if let Some((key, old_entry)) = old_key {
        if key != new_key {
            let tombstone = EntryWrapper::tombstone(
                key_attributes_entry(meta, gsi, old_entry),
                wrapper.created_at,
            );
            push(store, &key, tombstone);
        }
    }

    let projected = EntryWrapper::live(
        project_entry(meta, gsi, &wrapper.entry),
        wrapper.created_at,
    );
    push(store, &new_key, projected);
}

/// Rebuilds a GSI store from scratch by replaying every base row's version
/// history through the mirror rule. Used when an index is added to an
/// existing table.
#[must_use]
pub fn backfill(meta: &TableMetadata, gsi: &GlobalSecondaryIndexSetting, rows: &RowStore) -> RowStore {
    let mut store = RowStore::new();
    for (encoded, row) in rows.iter() {
        let mut previous: Option<&EntryWrapper> = None;
        for wrapper in row.tuple.versions() {
            mirror_mutation(meta, gsi, &mut store, encoded, previous, wrapper);
            previous = Some(wrapper);
        }
    }
    store
}

fn push(store: &mut RowStore, key: &GsiRowKey, wrapper: EntryWrapper) {
    store.push_version_keyed(
        key.encoded.clone(),
        key.partition.clone(),
        key.sort.clone(),
        wrapper,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
