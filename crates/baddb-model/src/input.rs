//! Wire-level input types consumed by the request builders.
//!
//! All input structs use `PascalCase` JSON field naming to match the
//! service's wire protocol. Optional fields are omitted when `None`; empty
//! maps and vectors deserialize from absent fields via `#[serde(default)]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;
use crate::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, Projection,
    ProvisionedThroughput, ReturnValue,
};

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Input for the `CreateTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    /// The name of the table to create.
    pub table_name: String,

    /// The key schema (partition key and optional sort key).
    pub key_schema: Vec<KeySchemaElement>,

    /// The attribute definitions for table and index key attributes.
    pub attribute_definitions: Vec<AttributeDefinition>,

    /// The billing mode (`PROVISIONED` or `PAY_PER_REQUEST`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,

    /// Provisioned throughput (required when the billing mode is
    /// `PROVISIONED`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,

    /// Global secondary indexes to create with the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
}

/// Input for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    /// The name of the table to delete.
    pub table_name: String,
}

/// Input for the `DescribeTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableInput {
    /// The name of the table to describe.
    pub table_name: String,
}

/// Input for the `ListTables` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesInput {
    /// The table name that starts the page, exclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_table_name: Option<String>,

    /// The maximum number of table names to return (1--100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

/// A single index change within an `UpdateTable` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndexUpdate {
    /// Create a new index on the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<CreateGlobalSecondaryIndexAction>,

    /// Delete an existing index from the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<DeleteGlobalSecondaryIndexAction>,
}

/// Action creating a new global secondary index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGlobalSecondaryIndexAction {
    /// The index name, unique within the table.
    pub index_name: String,
    /// The index key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// The attribute projection.
    pub projection: Projection,
    /// Optional provisioned throughput for the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

/// Action deleting a global secondary index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteGlobalSecondaryIndexAction {
    /// The name of the index to delete.
    pub index_name: String,
}

/// Input for the `UpdateTable` operation (index topology changes).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTableInput {
    /// The name of the table to update.
    pub table_name: String,

    /// Attribute definitions for any new index key attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_definitions: Vec<AttributeDefinition>,

    /// The index changes to apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_index_updates: Vec<GlobalSecondaryIndexUpdate>,
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The target table.
    pub table_name: String,

    /// The full item to store, including key attributes.
    pub item: HashMap<String, AttributeValue>,

    /// Optional condition that must hold for the write to proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// What to return about the replaced item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Input for the `GetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The target table.
    pub table_name: String,

    /// The primary key of the item to read.
    pub key: HashMap<String, AttributeValue>,

    /// Whether to bypass the staleness window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Optional projection expression limiting the returned attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
}

/// Input for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The target table.
    pub table_name: String,

    /// The primary key of the item to delete.
    pub key: HashMap<String, AttributeValue>,

    /// Optional condition that must hold for the delete to proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// What to return about the deleted item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

/// Input for the `UpdateItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// The target table.
    pub table_name: String,

    /// The primary key of the item to update.
    pub key: HashMap<String, AttributeValue>,

    /// The update expression (SET / REMOVE / ADD / DELETE clauses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,

    /// Optional condition that must hold for the update to proceed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// What to return about the updated item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_values: Option<ReturnValue>,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The target table.
    pub table_name: String,

    /// The index to query instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// The key condition expression (partition equality, optional sort-key
    /// predicate).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// Optional filter applied to matching items before they are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Optional projection expression limiting the returned attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Sort-key traversal direction (default: ascending).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// Whether to bypass the staleness window. Rejected when an index is
    /// named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Maximum number of items to return (1--100, default 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    /// The primary key to resume after, exclusive.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: HashMap<String, AttributeValue>,
}

/// Input for the `Scan` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The target table.
    pub table_name: String,

    /// The index to scan instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Optional filter applied to items before they are returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Optional projection expression limiting the returned attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Whether to bypass the staleness window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Maximum number of items to return (1--100, default 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,

    /// The primary key to resume after, exclusive.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: HashMap<String, AttributeValue>,

    /// Total number of parallel-scan segments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<i32>,

    /// This request's segment, in `[0, TotalSegments)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<i32>,
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// Per-table keys and read options for `BatchGetItem`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeysAndAttributes {
    /// The primary keys to read.
    pub keys: Vec<HashMap<String, AttributeValue>>,

    /// Whether to bypass the staleness window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Optional projection expression applied to each returned item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
}

/// Input for the `BatchGetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemInput {
    /// Keys to read, grouped by table.
    pub request_items: HashMap<String, KeysAndAttributes>,
}

/// A `Put` request inside a batch write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    /// The item to store.
    pub item: HashMap<String, AttributeValue>,
}

/// A `Delete` request inside a batch write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    /// The primary key of the item to delete.
    pub key: HashMap<String, AttributeValue>,
}

/// A single write within a `BatchWriteItem` request: exactly one of the two
/// fields is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteRequest {
    /// A put request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_request: Option<PutRequest>,

    /// A delete request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_request: Option<DeleteRequest>,
}

/// Input for the `BatchWriteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemInput {
    /// Writes to apply, grouped by table.
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A transactional `Put`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactPut {
    /// The target table.
    pub table_name: String,
    /// The item to store.
    pub item: HashMap<String, AttributeValue>,
    /// Optional condition that must hold for the transaction to commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

/// A transactional `Delete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactDelete {
    /// The target table.
    pub table_name: String,
    /// The primary key of the item to delete.
    pub key: HashMap<String, AttributeValue>,
    /// Optional condition that must hold for the transaction to commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

/// A transactional `Update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactUpdate {
    /// The target table.
    pub table_name: String,
    /// The primary key of the item to update.
    pub key: HashMap<String, AttributeValue>,
    /// The update expression.
    pub update_expression: String,
    /// Optional condition that must hold for the transaction to commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Substitutions for `#name` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Substitutions for `:value` placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

/// A single item in a `TransactWriteItems` request: exactly one of the
/// fields is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItem {
    /// A transactional put.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<TransactPut>,
    /// A transactional delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<TransactDelete>,
    /// A transactional update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<TransactUpdate>,
}

/// Input for the `TransactWriteItems` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsInput {
    /// The writes to apply atomically.
    pub transact_items: Vec<TransactWriteItem>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_deserialize_put_item_input() {
        let json = r#"{
            "TableName": "t",
            "Item": {"year": {"N": "2025"}, "title": {"S": "Hello"}},
            "ConditionExpression": "attribute_not_exists(title)"
        }"#;
        let input: PutItemInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.table_name, "t");
        assert_eq!(input.item.len(), 2);
        assert!(input.condition_expression.is_some());
        assert!(input.expression_attribute_values.is_empty());
    }

    #[test]
    fn test_should_deserialize_query_input_with_paging() {
        let json = r#"{
            "TableName": "t",
            "KeyConditionExpression": "year = :y",
            "ExpressionAttributeValues": {":y": {"N": "2025"}},
            "ScanIndexForward": false,
            "Limit": 2,
            "ExclusiveStartKey": {"year": {"N": "2025"}, "title": {"S": "a"}}
        }"#;
        let input: QueryInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.scan_index_forward, Some(false));
        assert_eq!(input.limit, Some(2));
        assert_eq!(input.exclusive_start_key.len(), 2);
    }

    #[test]
    fn test_should_deserialize_scan_segments() {
        let json = r#"{"TableName": "t", "TotalSegments": 3, "Segment": 1}"#;
        let input: ScanInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.total_segments, Some(3));
        assert_eq!(input.segment, Some(1));
    }

    #[test]
    fn test_should_deserialize_transact_write_items() {
        let json = r#"{
            "TransactItems": [
                {"Put": {"TableName": "t", "Item": {"pk": {"S": "a"}}}},
                {"Delete": {"TableName": "t", "Key": {"pk": {"S": "b"}}}}
            ]
        }"#;
        let input: TransactWriteItemsInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.transact_items.len(), 2);
        assert!(input.transact_items[0].put.is_some());
        assert!(input.transact_items[1].delete.is_some());
    }

    #[test]
    fn test_should_deserialize_batch_write_input() {
        let json = r#"{
            "RequestItems": {
                "t": [
                    {"PutRequest": {"Item": {"pk": {"S": "a"}}}},
                    {"DeleteRequest": {"Key": {"pk": {"S": "b"}}}}
                ]
            }
        }"#;
        let input: BatchWriteItemInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.request_items["t"].len(), 2);
    }
}
