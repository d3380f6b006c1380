//! Table metadata, per-table state, and admission bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::AtomicI64;

use chrono::{DateTime, Utc};

use baddb_model::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndexDescription, GlobalSecondaryIndexSetting,
    IndexProjection, KeySchema, KeySchemaElement, Projection, ProjectionType,
    ProvisionedThroughput, TableDescription, TableStatus,
};

use crate::limiter::TokenBucket;
use crate::store::RowStore;

/// The reserved control-plane table name. Writes to it mutate another
/// table's staleness and chaos knobs instead of storing an item.
pub const CONTROL_TABLE_NAME: &str = "baddb_table_metadata";

/// Table settings: everything a caller provides at creation time plus the
/// mutable staleness knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    /// The table name.
    pub table_name: String,
    /// The parsed partition key.
    pub partition_key: KeySchema,
    /// The parsed sort key, if the table has one.
    pub sort_key: Option<KeySchema>,
    /// The wire-form key schema, kept for `DescribeTable`.
    pub key_schema_elements: Vec<KeySchemaElement>,
    /// Attribute definitions for table and index key attributes.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Global secondary indexes.
    pub global_secondary_indexes: Vec<GlobalSecondaryIndexSetting>,
    /// The billing mode.
    pub billing_mode: BillingMode,
    /// Provisioned throughput when the billing mode is `PROVISIONED`.
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Staleness window for non-consistent base-table reads, in seconds.
    pub table_delay_seconds: i64,
    /// Staleness window for index reads, in seconds.
    pub gsi_delay_seconds: i64,
}

impl TableMetadata {
    /// Looks up a GSI by name.
    #[must_use]
    pub fn gsi(&self, index_name: &str) -> Option<&GlobalSecondaryIndexSetting> {
        self.global_secondary_indexes
            .iter()
            .find(|gsi| gsi.index_name == index_name)
    }
}

/// One table: metadata, identity stamped at creation, and the backing row
/// stores.
#[derive(Debug)]
pub struct Table {
    /// The table settings.
    pub meta: TableMetadata,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Stable table id (UUID v4).
    pub table_id: String,
    /// The table ARN.
    pub arn: String,
    /// The base row store.
    pub rows: RowStore,
    /// One backing row store per GSI, keyed by index name.
    pub gsi_rows: HashMap<String, RowStore>,
}

impl Table {
    /// Number of items a consistent read would currently observe.
    #[must_use]
    pub fn live_item_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|(_, row)| row.tuple.newest().is_some_and(|w| !w.is_deleted))
            .count()
    }

    /// Builds the `DescribeTable` view of this table.
    #[must_use]
    pub fn to_description(&self) -> TableDescription {
        #[allow(clippy::cast_precision_loss)]
        let creation_time = self.created_at.timestamp() as f64;
        TableDescription {
            table_name: self.meta.table_name.clone(),
            table_status: TableStatus::Active,
            key_schema: self.meta.key_schema_elements.clone(),
            attribute_definitions: self.meta.attribute_definitions.clone(),
            billing_mode: self.meta.billing_mode,
            provisioned_throughput: self.meta.provisioned_throughput,
            global_secondary_indexes: self
                .meta
                .global_secondary_indexes
                .iter()
                .map(|gsi| GlobalSecondaryIndexDescription {
                    index_name: gsi.index_name.clone(),
                    key_schema: gsi_key_schema_elements(gsi),
                    projection: projection_to_wire(&gsi.projection),
                    provisioned_throughput: gsi.provisioned_throughput,
                    index_arn: format!("{}/index/{}", self.arn, gsi.index_name),
                })
                .collect(),
            item_count: i64::try_from(self.live_item_count()).unwrap_or(i64::MAX),
            creation_date_time: creation_time,
            table_id: self.table_id.clone(),
            table_arn: self.arn.clone(),
        }
    }
}

/// Reconstructs the wire key schema of a GSI from its parsed form.
#[must_use]
pub fn gsi_key_schema_elements(gsi: &GlobalSecondaryIndexSetting) -> Vec<KeySchemaElement> {
    let mut elements = vec![KeySchemaElement {
        attribute_name: gsi.partition_key.attribute_name.clone(),
        key_type: baddb_model::types::KeyType::Hash,
    }];
    if let Some(sort) = &gsi.sort_key {
        elements.push(KeySchemaElement {
            attribute_name: sort.attribute_name.clone(),
            key_type: baddb_model::types::KeyType::Range,
        });
    }
    elements
}

/// Converts a parsed projection back to its wire form.
#[must_use]
pub fn projection_to_wire(projection: &IndexProjection) -> Projection {
    match projection {
        IndexProjection::All => Projection {
            projection_type: ProjectionType::All,
            non_key_attributes: Vec::new(),
        },
        IndexProjection::KeysOnly => Projection {
            projection_type: ProjectionType::KeysOnly,
            non_key_attributes: Vec::new(),
        },
        IndexProjection::Include(attrs) => Projection {
            projection_type: ProjectionType::Include,
            non_key_attributes: attrs.clone(),
        },
    }
}

// ---------------------------------------------------------------------------
// Admission state
// ---------------------------------------------------------------------------

/// Per-table admission state: the chaos counter and the token buckets.
///
/// Lives outside the engine transaction lock so the chaos counter and the
/// limiters can be consulted without serializing on in-flight transactions.
#[derive(Debug)]
pub struct TableAdmission {
    /// Requests remaining to fail with `Unprocessed`. Decrements atomically;
    /// reaching zero is permanent until the control table sets it again.
    pub unprocessed: AtomicI64,
    /// Write limiter (1 token per write) in `PROVISIONED` mode.
    pub write_limiter: Option<TokenBucket>,
    /// Read limiter (1 token eventual, 2 tokens strong) in `PROVISIONED`
    /// mode. Sized at twice the read capacity so a strongly consistent read
    /// costs one full read unit.
    pub read_limiter: Option<TokenBucket>,
    /// Independent read limiters per GSI.
    pub gsi_read_limiters: HashMap<String, TokenBucket>,
}

impl TableAdmission {
    /// Builds the admission state for a table, carrying over an existing
    /// chaos counter value across metadata swaps.
    #[must_use]
    pub fn for_table(meta: &TableMetadata, now: DateTime<Utc>, unprocessed: i64) -> Self {
        let (write_limiter, read_limiter, gsi_read_limiters) =
            if meta.billing_mode == BillingMode::Provisioned {
                let throughput = meta.provisioned_throughput.unwrap_or(ProvisionedThroughput {
                    read_capacity_units: 0,
                    write_capacity_units: 0,
                });
                #[allow(clippy::cast_precision_loss)]
                let write = TokenBucket::new(
                    throughput.write_capacity_units as f64,
                    throughput.write_capacity_units as f64,
                    now,
                );
                #[allow(clippy::cast_precision_loss)]
                let read = TokenBucket::new(
                    2.0 * throughput.read_capacity_units as f64,
                    2.0 * throughput.read_capacity_units as f64,
                    now,
                );
                let gsi = meta
                    .global_secondary_indexes
                    .iter()
                    .map(|g| {
                        let capacity = g
                            .provisioned_throughput
                            .unwrap_or(throughput)
                            .read_capacity_units;
                        #[allow(clippy::cast_precision_loss)]
                        let bucket =
                            TokenBucket::new(2.0 * capacity as f64, 2.0 * capacity as f64, now);
                        (g.index_name.clone(), bucket)
                    })
                    .collect();
                (Some(write), Some(read), gsi)
            } else {
                (None, None, HashMap::new())
            };

        Self {
            unprocessed: AtomicI64::new(unprocessed),
            write_limiter,
            read_limiter,
            gsi_read_limiters,
        }
    }
}
