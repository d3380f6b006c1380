//! Request builders: translate wire-level inputs into internal requests.
//!
//! Builders validate schema conformance eagerly, before any engine state is
//! touched: keys are type-checked against the table schema, numbers are
//! validated as finite doubles, expressions are parsed and bound, and query
//! parameters are range-checked. The engine only ever sees well-formed
//! internal requests.

use std::collections::HashMap;

use baddb_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, GetItemInput,
    PutItemInput, QueryInput, ScanInput, TransactWriteItemsInput, UpdateItemInput,
    UpdateTableInput,
};
use baddb_model::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, GlobalSecondaryIndexSetting,
    IndexProjection, KeySchema, KeySchemaElement, KeyType, Projection, ProjectionType,
};
use baddb_model::{AttributeValue, Entry};

use crate::config::BaddbConfig;
use crate::error::{BaddbError, BaddbResult};
use crate::expression::{ConditionExpression, ProjectionExpression, UpdateOperation};
use crate::gsi;
use crate::key::validated_key;
use crate::plan::build_key_condition;
use crate::request::{
    BatchGetRequest, BatchWriteOperation, BatchWriteRequest, DeleteRequest, GetRequest,
    PutRequest, Query, ScanRequest, ScanSegments, TransactWriteOperation, TransactWriteRequest,
    UpdateRequest, UpdateTableRequest,
};
use crate::table::TableMetadata;

/// Default and maximum page size for `Query` and `Scan`.
const MAX_PAGE_SIZE: i32 = 100;

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Builds table settings from a `CreateTable` input.
///
/// # Errors
///
/// Returns `BaddbError::Validation` for a malformed key schema, attribute
/// definitions, billing configuration, or index definition.
pub fn build_table_metadata(
    input: CreateTableInput,
    config: &BaddbConfig,
) -> BaddbResult<TableMetadata> {
    if input.table_name.is_empty() {
        return Err(BaddbError::validation("a table name is required"));
    }

    let (partition_key, sort_key) =
        parse_key_schema(&input.key_schema, &input.attribute_definitions)?;

    let billing_mode = input.billing_mode.unwrap_or_default();
    match billing_mode {
        BillingMode::Provisioned if input.provisioned_throughput.is_none() => {
            return Err(BaddbError::validation(
                "provisioned billing mode requires ProvisionedThroughput",
            ));
        }
        BillingMode::PayPerRequest if input.provisioned_throughput.is_some() => {
            return Err(BaddbError::validation(
                "ProvisionedThroughput cannot be specified with PAY_PER_REQUEST billing",
            ));
        }
        _ => {}
    }
    if let Some(throughput) = input.provisioned_throughput {
        if throughput.read_capacity_units < 1 || throughput.write_capacity_units < 1 {
            return Err(BaddbError::validation(
                "provisioned capacity units must be at least 1",
            ));
        }
    }

    let mut indexes = Vec::with_capacity(input.global_secondary_indexes.len());
    for definition in &input.global_secondary_indexes {
        let setting = parse_gsi(definition, &input.attribute_definitions)?;
        if indexes
            .iter()
            .any(|existing: &GlobalSecondaryIndexSetting| {
                existing.index_name == setting.index_name
            })
        {
            return Err(BaddbError::validation(format!(
                "duplicate index name: {}",
                setting.index_name
            )));
        }
        indexes.push(setting);
    }

    Ok(TableMetadata {
        table_name: input.table_name,
        partition_key,
        sort_key,
        key_schema_elements: input.key_schema,
        attribute_definitions: input.attribute_definitions,
        global_secondary_indexes: indexes,
        billing_mode,
        provisioned_throughput: input.provisioned_throughput,
        table_delay_seconds: config.default_table_delay_seconds,
        gsi_delay_seconds: config.default_gsi_delay_seconds,
    })
}

/// Builds an `UpdateTable` request, resolving new index definitions against
/// the union of existing and newly supplied attribute definitions.
pub fn build_update_table(
    meta: &TableMetadata,
    input: UpdateTableInput,
) -> BaddbResult<UpdateTableRequest> {
    let mut definitions = meta.attribute_definitions.clone();
    for definition in input.attribute_definitions {
        if !definitions
            .iter()
            .any(|d| d.attribute_name == definition.attribute_name)
        {
            definitions.push(definition);
        }
    }

    let mut create = Vec::new();
    let mut delete = Vec::new();
    for update in input.global_secondary_index_updates {
        match (update.create, update.delete) {
            (Some(action), None) => {
                let definition = GlobalSecondaryIndex {
                    index_name: action.index_name,
                    key_schema: action.key_schema,
                    projection: action.projection,
                    provisioned_throughput: action.provisioned_throughput,
                };
                create.push(parse_gsi(&definition, &definitions)?);
            }
            (None, Some(action)) => delete.push(action.index_name),
            _ => {
                return Err(BaddbError::validation(
                    "each index update must contain exactly one of Create or Delete",
                ));
            }
        }
    }

    if create.is_empty() && delete.is_empty() {
        return Err(BaddbError::validation(
            "UpdateTable requires at least one index change",
        ));
    }

    Ok(UpdateTableRequest {
        table_name: input.table_name,
        create,
        delete,
    })
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Builds an internal `Put` from a wire input.
///
/// # Errors
///
/// Returns `BaddbError::Validation` for schema violations or invalid
/// numbers, and an expression error kind for a bad condition.
pub fn build_put(meta: &TableMetadata, input: PutItemInput) -> BaddbResult<PutRequest> {
    let entry = Entry::from(input.item);
    validate_numbers(&entry)?;
    validated_key(&meta.partition_key, meta.sort_key.as_ref(), &entry)?;

    let condition = input
        .condition_expression
        .as_deref()
        .map(|text| {
            ConditionExpression::new(
                text,
                &input.expression_attribute_names,
                &input.expression_attribute_values,
            )
        })
        .transpose()
        .map_err(BaddbError::condition_expression)?;

    Ok(PutRequest {
        table_name: input.table_name,
        entry,
        condition,
    })
}

/// Builds an internal `Get` from a wire input.
pub fn build_get(meta: &TableMetadata, input: GetItemInput) -> BaddbResult<GetRequest> {
    let key_entry = validated_key_entry(meta, input.key)?;
    let key = validated_key(&meta.partition_key, meta.sort_key.as_ref(), &key_entry)?;

    let projection = input
        .projection_expression
        .as_deref()
        .map(|text| ProjectionExpression::new(text, &input.expression_attribute_names))
        .transpose()
        .map_err(BaddbError::condition_expression)?;

    Ok(GetRequest {
        table_name: input.table_name,
        key,
        key_entry,
        consistent_read: input.consistent_read.unwrap_or(false),
        projection,
    })
}

/// Builds an internal `Delete` from a wire input.
pub fn build_delete(meta: &TableMetadata, input: DeleteItemInput) -> BaddbResult<DeleteRequest> {
    let key_entry = validated_key_entry(meta, input.key)?;
    let key = validated_key(&meta.partition_key, meta.sort_key.as_ref(), &key_entry)?;

    let condition = input
        .condition_expression
        .as_deref()
        .map(|text| {
            ConditionExpression::new(
                text,
                &input.expression_attribute_names,
                &input.expression_attribute_values,
            )
        })
        .transpose()
        .map_err(BaddbError::condition_expression)?;

    Ok(DeleteRequest {
        table_name: input.table_name,
        key,
        key_entry,
        condition,
    })
}

/// Builds an internal `Update` from a wire input.
pub fn build_update(meta: &TableMetadata, input: UpdateItemInput) -> BaddbResult<UpdateRequest> {
    let key_entry = validated_key_entry(meta, input.key)?;
    let key = validated_key(&meta.partition_key, meta.sort_key.as_ref(), &key_entry)?;

    let Some(update_text) = input.update_expression.as_deref() else {
        return Err(BaddbError::validation("an UpdateExpression is required"));
    };
    for value in input.expression_attribute_values.values() {
        value.validate_number().map_err(BaddbError::from)?;
    }
    let update = UpdateOperation::new(
        update_text,
        &input.expression_attribute_names,
        &input.expression_attribute_values,
    )
    .map_err(BaddbError::update_expression)?;

    let condition = input
        .condition_expression
        .as_deref()
        .map(|text| {
            ConditionExpression::new(
                text,
                &input.expression_attribute_names,
                &input.expression_attribute_values,
            )
        })
        .transpose()
        .map_err(BaddbError::condition_expression)?;

    Ok(UpdateRequest {
        table_name: input.table_name,
        key,
        key_entry,
        update,
        condition,
    })
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Builds an internal `Query` from a wire input.
pub fn build_query(meta: &TableMetadata, input: QueryInput) -> BaddbResult<Query> {
    let consistent_read = input.consistent_read.unwrap_or(false);
    if consistent_read && input.index_name.is_some() {
        return Err(BaddbError::validation(
            "consistent reads are not supported on a global secondary index",
        ));
    }

    let (partition_key, sort_key) = query_target_keys(meta, input.index_name.as_deref())?;

    let Some(key_condition_text) = input.key_condition_expression.as_deref() else {
        return Err(BaddbError::validation(
            "a KeyConditionExpression is required for Query",
        ));
    };
    let key_condition = build_key_condition(
        key_condition_text,
        &input.expression_attribute_names,
        &input.expression_attribute_values,
        partition_key,
        sort_key,
    )?;

    let filter = input
        .filter_expression
        .as_deref()
        .map(|text| {
            ConditionExpression::new(
                text,
                &input.expression_attribute_names,
                &input.expression_attribute_values,
            )
        })
        .transpose()
        .map_err(BaddbError::filter_expression)?;

    let projection = input
        .projection_expression
        .as_deref()
        .map(|text| ProjectionExpression::new(text, &input.expression_attribute_names))
        .transpose()
        .map_err(BaddbError::condition_expression)?;

    let exclusive_start_key =
        encode_start_key(meta, input.index_name.as_deref(), &input.exclusive_start_key)?;

    Ok(Query {
        table_name: input.table_name,
        index_name: input.index_name,
        key_condition,
        filter,
        projection,
        scan_index_forward: input.scan_index_forward.unwrap_or(true),
        consistent_read,
        limit: validated_limit(input.limit)?,
        exclusive_start_key,
    })
}

/// Builds an internal `Scan` from a wire input.
pub fn build_scan(meta: &TableMetadata, input: ScanInput) -> BaddbResult<ScanRequest> {
    let consistent_read = input.consistent_read.unwrap_or(false);
    if consistent_read && input.index_name.is_some() {
        return Err(BaddbError::validation(
            "consistent reads are not supported on a global secondary index",
        ));
    }

    // Validate the index name even though scans ignore key conditions.
    query_target_keys(meta, input.index_name.as_deref())?;

    let segments = match (input.total_segments, input.segment) {
        (None, None) => None,
        (Some(total), Some(segment)) => {
            if total < 1 {
                return Err(BaddbError::validation("TotalSegments must be at least 1"));
            }
            if segment < 0 || segment >= total {
                return Err(BaddbError::validation(
                    "Segment must be between 0 and TotalSegments - 1",
                ));
            }
            #[allow(clippy::cast_sign_loss)]
            let segments = ScanSegments {
                total_segments: total as u32,
                segment: segment as u32,
            };
            Some(segments)
        }
        _ => {
            return Err(BaddbError::validation(
                "TotalSegments and Segment must be specified together",
            ));
        }
    };

    let filter = input
        .filter_expression
        .as_deref()
        .map(|text| {
            ConditionExpression::new(
                text,
                &input.expression_attribute_names,
                &input.expression_attribute_values,
            )
        })
        .transpose()
        .map_err(BaddbError::filter_expression)?;

    let projection = input
        .projection_expression
        .as_deref()
        .map(|text| ProjectionExpression::new(text, &input.expression_attribute_names))
        .transpose()
        .map_err(BaddbError::condition_expression)?;

    let exclusive_start_key =
        encode_start_key(meta, input.index_name.as_deref(), &input.exclusive_start_key)?;

    Ok(ScanRequest {
        table_name: input.table_name,
        index_name: input.index_name,
        filter,
        projection,
        consistent_read,
        limit: validated_limit(input.limit)?,
        exclusive_start_key,
        segments,
    })
}

// ---------------------------------------------------------------------------
// Batch and transactional operations
// ---------------------------------------------------------------------------

/// Builds an internal `BatchGet`, resolving each table's metadata through
/// the given lookup.
pub fn build_batch_get(
    input: BatchGetItemInput,
    lookup: impl Fn(&str) -> BaddbResult<TableMetadata>,
) -> BaddbResult<BatchGetRequest> {
    let mut gets = Vec::new();
    for (table_name, keys_and_attributes) in input.request_items {
        let meta = lookup(&table_name)?;
        for key in keys_and_attributes.keys {
            gets.push(build_get(
                &meta,
                GetItemInput {
                    table_name: table_name.clone(),
                    key,
                    consistent_read: keys_and_attributes.consistent_read,
                    projection_expression: keys_and_attributes.projection_expression.clone(),
                    expression_attribute_names: keys_and_attributes
                        .expression_attribute_names
                        .clone(),
                },
            )?);
        }
    }
    Ok(BatchGetRequest { gets })
}

/// Builds an internal `BatchWrite`.
pub fn build_batch_write(
    input: BatchWriteItemInput,
    lookup: impl Fn(&str) -> BaddbResult<TableMetadata>,
) -> BaddbResult<BatchWriteRequest> {
    let mut writes = Vec::new();
    for (table_name, requests) in input.request_items {
        let meta = lookup(&table_name)?;
        for request in requests {
            match (request.put_request, request.delete_request) {
                (Some(put), None) => {
                    let entry = Entry::from(put.item);
                    validate_numbers(&entry)?;
                    validated_key(&meta.partition_key, meta.sort_key.as_ref(), &entry)?;
                    writes.push(BatchWriteOperation::Put {
                        table_name: table_name.clone(),
                        entry,
                    });
                }
                (None, Some(delete)) => {
                    let key_entry = validated_key_entry(&meta, delete.key)?;
                    let key =
                        validated_key(&meta.partition_key, meta.sort_key.as_ref(), &key_entry)?;
                    writes.push(BatchWriteOperation::Delete {
                        table_name: table_name.clone(),
                        key,
                        key_entry,
                    });
                }
                _ => {
                    return Err(BaddbError::validation(
                        "each write request must contain exactly one of PutRequest or \
                         DeleteRequest",
                    ));
                }
            }
        }
    }
    Ok(BatchWriteRequest { writes })
}

/// Builds an internal `TransactWriteItems`.
pub fn build_transact_write(
    input: TransactWriteItemsInput,
    lookup: impl Fn(&str) -> BaddbResult<TableMetadata>,
) -> BaddbResult<TransactWriteRequest> {
    let mut items = Vec::new();
    for item in input.transact_items {
        match (item.put, item.delete, item.update) {
            (Some(put), None, None) => {
                let meta = lookup(&put.table_name)?;
                items.push(TransactWriteOperation::Put(build_put(
                    &meta,
                    PutItemInput {
                        table_name: put.table_name,
                        item: put.item,
                        condition_expression: put.condition_expression,
                        expression_attribute_names: put.expression_attribute_names,
                        expression_attribute_values: put.expression_attribute_values,
                        return_values: None,
                    },
                )?));
            }
            (None, Some(delete), None) => {
                let meta = lookup(&delete.table_name)?;
                items.push(TransactWriteOperation::Delete(build_delete(
                    &meta,
                    DeleteItemInput {
                        table_name: delete.table_name,
                        key: delete.key,
                        condition_expression: delete.condition_expression,
                        expression_attribute_names: delete.expression_attribute_names,
                        expression_attribute_values: delete.expression_attribute_values,
                        return_values: None,
                    },
                )?));
            }
            (None, None, Some(update)) => {
                let meta = lookup(&update.table_name)?;
                items.push(TransactWriteOperation::Update(build_update(
                    &meta,
                    UpdateItemInput {
                        table_name: update.table_name,
                        key: update.key,
                        update_expression: Some(update.update_expression),
                        condition_expression: update.condition_expression,
                        expression_attribute_names: update.expression_attribute_names,
                        expression_attribute_values: update.expression_attribute_values,
                        return_values: None,
                    },
                )?));
            }
            _ => {
                return Err(BaddbError::validation(
                    "each transact item must contain exactly one of Put, Delete, or Update",
                ));
            }
        }
    }
    if items.is_empty() {
        return Err(BaddbError::validation(
            "TransactWriteItems requires at least one item",
        ));
    }
    Ok(TransactWriteRequest { items })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parses wire key schema elements into the partition and optional sort key.
fn parse_key_schema(
    elements: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> BaddbResult<(KeySchema, Option<KeySchema>)> {
    let mut partition = None;
    let mut sort = None;
    for element in elements {
        let slot = match element.key_type {
            KeyType::Hash => &mut partition,
            KeyType::Range => &mut sort,
        };
        if slot.is_some() {
            return Err(BaddbError::validation(
                "the key schema declares a key role more than once",
            ));
        }
        *slot = Some(resolve_key_schema(&element.attribute_name, definitions)?);
    }
    let partition = partition.ok_or_else(|| {
        BaddbError::validation("the key schema must declare a HASH key element")
    })?;
    Ok((partition, sort))
}

/// Resolves one key attribute's declared scalar type.
fn resolve_key_schema(
    name: &str,
    definitions: &[AttributeDefinition],
) -> BaddbResult<KeySchema> {
    let definition = definitions
        .iter()
        .find(|d| d.attribute_name == name)
        .ok_or_else(|| {
            BaddbError::validation(format!(
                "attribute {name} is referenced in a key schema but not defined in \
                 AttributeDefinitions"
            ))
        })?;
    if !definition.attribute_type.is_valid_key_type() {
        return Err(BaddbError::validation(format!(
            "attribute {name} has invalid key type {}",
            definition.attribute_type
        )));
    }
    Ok(KeySchema {
        attribute_name: definition.attribute_name.clone(),
        attribute_type: definition.attribute_type.clone(),
    })
}

/// Parses a wire GSI definition.
fn parse_gsi(
    definition: &GlobalSecondaryIndex,
    definitions: &[AttributeDefinition],
) -> BaddbResult<GlobalSecondaryIndexSetting> {
    if definition.index_name.is_empty() {
        return Err(BaddbError::validation("an index name is required"));
    }
    let (partition_key, sort_key) = parse_key_schema(&definition.key_schema, definitions)?;
    let projection = parse_projection_setting(&definition.projection)?;
    Ok(GlobalSecondaryIndexSetting {
        index_name: definition.index_name.clone(),
        partition_key,
        sort_key,
        projection,
        provisioned_throughput: definition.provisioned_throughput,
    })
}

fn parse_projection_setting(projection: &Projection) -> BaddbResult<IndexProjection> {
    match projection.projection_type {
        ProjectionType::All => Ok(IndexProjection::All),
        ProjectionType::KeysOnly => Ok(IndexProjection::KeysOnly),
        ProjectionType::Include => {
            if projection.non_key_attributes.is_empty() {
                return Err(BaddbError::validation(
                    "an INCLUDE projection requires NonKeyAttributes",
                ));
            }
            Ok(IndexProjection::Include(projection.non_key_attributes.clone()))
        }
    }
}

/// Validates a wire key map: exactly the schema's key attributes, with
/// matching types.
fn validated_key_entry(
    meta: &TableMetadata,
    key: HashMap<String, AttributeValue>,
) -> BaddbResult<Entry> {
    let expected = 1 + usize::from(meta.sort_key.is_some());
    if key.len() != expected {
        return Err(BaddbError::validation(format!(
            "the provided key element does not match the schema; expected {expected} key \
             attribute(s), found {}",
            key.len()
        )));
    }
    let entry = Entry::from(key);
    validated_key(&meta.partition_key, meta.sort_key.as_ref(), &entry)?;
    Ok(entry)
}

/// Recursively validates every `N` value in an entry as a finite double.
fn validate_numbers(entry: &Entry) -> BaddbResult<()> {
    for (name, value) in entry.iter() {
        validate_value_numbers(name, value)?;
    }
    Ok(())
}

fn validate_value_numbers(attribute: &str, value: &AttributeValue) -> BaddbResult<()> {
    match value {
        AttributeValue::N(raw) => {
            if raw.parse::<f64>().map(f64::is_finite) != Ok(true) {
                return Err(BaddbError::validation(format!(
                    "value cannot be converted to a number: attribute {attribute}"
                )));
            }
        }
        AttributeValue::Ns(values) => {
            for raw in values {
                if raw.parse::<f64>().map(f64::is_finite) != Ok(true) {
                    return Err(BaddbError::validation(format!(
                        "value cannot be converted to a number: attribute {attribute}"
                    )));
                }
            }
        }
        AttributeValue::L(values) => {
            for value in values {
                validate_value_numbers(attribute, value)?;
            }
        }
        AttributeValue::M(map) => {
            for value in map.values() {
                validate_value_numbers(attribute, value)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Clamp-checks a wire page limit into `1..=100`, defaulting to 100.
#[allow(clippy::cast_sign_loss)]
fn validated_limit(limit: Option<i32>) -> BaddbResult<usize> {
    match limit {
        None => Ok(MAX_PAGE_SIZE as usize),
        Some(value) if (1..=MAX_PAGE_SIZE).contains(&value) => Ok(value as usize),
        Some(value) => Err(BaddbError::validation(format!(
            "Limit must be between 1 and {MAX_PAGE_SIZE}, found {value}"
        ))),
    }
}

/// The key schemas a query binds against: the base table's or the GSI's.
fn query_target_keys<'a>(
    meta: &'a TableMetadata,
    index: Option<&str>,
) -> BaddbResult<(&'a KeySchema, Option<&'a KeySchema>)> {
    match index {
        Some(index_name) => {
            let setting = meta
                .gsi(index_name)
                .ok_or_else(|| BaddbError::index_not_found(&meta.table_name, index_name))?;
            Ok((&setting.partition_key, setting.sort_key.as_ref()))
        }
        None => Ok((&meta.partition_key, meta.sort_key.as_ref())),
    }
}

/// Encodes an `ExclusiveStartKey` map into the row-key bytes of the query
/// target. For an index the map must carry both the index keys and the base
/// table keys.
fn encode_start_key(
    meta: &TableMetadata,
    index: Option<&str>,
    start_key: &HashMap<String, AttributeValue>,
) -> BaddbResult<Option<Vec<u8>>> {
    if start_key.is_empty() {
        return Ok(None);
    }
    let entry = Entry::from(start_key.clone());
    let base_key = validated_key(&meta.partition_key, meta.sort_key.as_ref(), &entry)
        .map_err(|_| BaddbError::validation("the provided ExclusiveStartKey is invalid"))?;

    match index {
        Some(index_name) => {
            let setting = meta
                .gsi(index_name)
                .ok_or_else(|| BaddbError::index_not_found(&meta.table_name, index_name))?;
            let row_key = gsi::gsi_row_key(setting, &entry, &base_key.encoded());
            if row_key.partition.is_empty() {
                return Err(BaddbError::validation(
                    "the provided ExclusiveStartKey is missing the index partition key",
                ));
            }
            Ok(Some(row_key.encoded))
        }
        None => Ok(Some(base_key.encoded())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
