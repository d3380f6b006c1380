//! Internal requests and results: what the request builders produce and the
//! storage engine consumes.
//!
//! Expressions arrive here already parsed and bound; key bytes are already
//! encoded. The engine performs no wire-level validation of its own.

use std::collections::HashMap;

use baddb_model::Entry;

use crate::expression::{ConditionExpression, ProjectionExpression, UpdateOperation};
use crate::key::PrimaryKey;
use crate::plan::KeyCondition;

/// An internal `Put`.
#[derive(Debug)]
pub struct PutRequest {
    /// The target table.
    pub table_name: String,
    /// The full entry to store.
    pub entry: Entry,
    /// Compiled condition, if any.
    pub condition: Option<ConditionExpression>,
}

/// An internal `Get`.
#[derive(Debug)]
pub struct GetRequest {
    /// The target table.
    pub table_name: String,
    /// The encoded primary key.
    pub key: PrimaryKey,
    /// The key attributes as provided, kept for unprocessed-key reporting.
    pub key_entry: Entry,
    /// Whether to bypass the staleness window.
    pub consistent_read: bool,
    /// Compiled projection, if any.
    pub projection: Option<ProjectionExpression>,
}

/// An internal `Delete`.
#[derive(Debug)]
pub struct DeleteRequest {
    /// The target table.
    pub table_name: String,
    /// The encoded primary key.
    pub key: PrimaryKey,
    /// The key attributes, used as the tombstone body.
    pub key_entry: Entry,
    /// Compiled condition, if any.
    pub condition: Option<ConditionExpression>,
}

/// An internal `Update`.
#[derive(Debug)]
pub struct UpdateRequest {
    /// The target table.
    pub table_name: String,
    /// The encoded primary key.
    pub key: PrimaryKey,
    /// The key attributes, seeding the entry when the item does not exist.
    pub key_entry: Entry,
    /// The compiled update operation.
    pub update: UpdateOperation,
    /// Compiled condition, if any.
    pub condition: Option<ConditionExpression>,
}

/// An internal `Query`.
#[derive(Debug)]
pub struct Query {
    /// The target table.
    pub table_name: String,
    /// The GSI to query instead of the base table.
    pub index_name: Option<String>,
    /// The bound key condition.
    pub key_condition: KeyCondition,
    /// Compiled filter, if any.
    pub filter: Option<ConditionExpression>,
    /// Compiled projection, if any.
    pub projection: Option<ProjectionExpression>,
    /// Traversal direction.
    pub scan_index_forward: bool,
    /// Whether to bypass the staleness window (base table only).
    pub consistent_read: bool,
    /// Maximum number of items to return.
    pub limit: usize,
    /// Encoded row key to resume strictly after.
    pub exclusive_start_key: Option<Vec<u8>>,
}

/// Parallel-scan segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSegments {
    /// Total number of segments.
    pub total_segments: u32,
    /// This request's segment, in `[0, total_segments)`.
    pub segment: u32,
}

/// An internal `Scan`.
#[derive(Debug)]
pub struct ScanRequest {
    /// The target table.
    pub table_name: String,
    /// The GSI to scan instead of the base table.
    pub index_name: Option<String>,
    /// Compiled filter, if any.
    pub filter: Option<ConditionExpression>,
    /// Compiled projection, if any.
    pub projection: Option<ProjectionExpression>,
    /// Whether to bypass the staleness window (base table only).
    pub consistent_read: bool,
    /// Maximum number of items to return.
    pub limit: usize,
    /// Encoded row key to resume strictly after.
    pub exclusive_start_key: Option<Vec<u8>>,
    /// Parallel-scan segmentation, if any.
    pub segments: Option<ScanSegments>,
}

/// Result of a `Query` or `Scan`.
#[derive(Debug, Default)]
pub struct QueryResult {
    /// The matching entries, in the requested order.
    pub entries: Vec<Entry>,
    /// Number of entries examined before filtering.
    pub scanned_count: usize,
}

/// Result of an `Update`: the entry before and after.
#[derive(Debug)]
pub struct UpdateResult {
    /// The entry as it was (empty if the item did not exist).
    pub old: Entry,
    /// The entry as stored.
    pub new: Entry,
}

/// An internal `BatchGet`.
#[derive(Debug)]
pub struct BatchGetRequest {
    /// The individual gets, each carrying its own table name.
    pub gets: Vec<GetRequest>,
}

/// Result of a `BatchGet`.
#[derive(Debug, Default)]
pub struct BatchGetResult {
    /// Retrieved entries, grouped by table.
    pub responses: HashMap<String, Vec<Entry>>,
    /// Keys that hit the chaos counter, grouped by table.
    pub unprocessed_keys: HashMap<String, Vec<Entry>>,
}

/// One write within a `BatchWrite`.
#[derive(Debug)]
pub enum BatchWriteOperation {
    /// Store an entry.
    Put {
        /// The target table.
        table_name: String,
        /// The full entry to store.
        entry: Entry,
    },
    /// Delete an entry.
    Delete {
        /// The target table.
        table_name: String,
        /// The encoded primary key.
        key: PrimaryKey,
        /// The key attributes, used as the tombstone body.
        key_entry: Entry,
    },
}

impl BatchWriteOperation {
    /// The table this write targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Put { table_name, .. } | Self::Delete { table_name, .. } => table_name,
        }
    }
}

/// An internal `BatchWrite`.
#[derive(Debug)]
pub struct BatchWriteRequest {
    /// The individual writes.
    pub writes: Vec<BatchWriteOperation>,
}

/// Result of a `BatchWrite`.
#[derive(Debug, Default)]
pub struct BatchWriteResult {
    /// Writes that hit the chaos counter, grouped by table.
    pub unprocessed: HashMap<String, Vec<BatchWriteOperation>>,
}

/// One item of a `TransactWriteItems`.
#[derive(Debug)]
pub enum TransactWriteOperation {
    /// A conditional put.
    Put(PutRequest),
    /// A conditional delete.
    Delete(DeleteRequest),
    /// A conditional update.
    Update(UpdateRequest),
}

impl TransactWriteOperation {
    /// The table this item targets.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Put(r) => &r.table_name,
            Self::Delete(r) => &r.table_name,
            Self::Update(r) => &r.table_name,
        }
    }
}

/// An internal `TransactWriteItems`.
#[derive(Debug)]
pub struct TransactWriteRequest {
    /// The items to apply atomically.
    pub items: Vec<TransactWriteOperation>,
}

/// An internal `UpdateTable`: GSI topology changes.
#[derive(Debug)]
pub struct UpdateTableRequest {
    /// The target table.
    pub table_name: String,
    /// Indexes to create (backfilled from existing rows).
    pub create: Vec<baddb_model::types::GlobalSecondaryIndexSetting>,
    /// Index names to delete.
    pub delete: Vec<String>,
}
