//! Shared schema, index, and table types.
//!
//! Wire-facing structs follow the service's JSON format with `PascalCase`
//! field names via `#[serde(rename_all = "PascalCase")]`; enum variants map
//! to the `SCREAMING_SNAKE_CASE` wire strings with `#[serde(rename)]`.
//! The `*Setting`/`KeySchema` types are the parsed internal forms consumed
//! by the storage engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Key type within a key schema element.
///
/// `Hash` denotes the partition key; `Range` denotes the sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Partition key.
    #[serde(rename = "HASH")]
    Hash,
    /// Sort key.
    #[serde(rename = "RANGE")]
    Range,
}

/// Scalar attribute types allowed for key attributes.
///
/// Only `S`, `N`, and `B` are valid for keys, but the wire protocol may
/// carry other values which must surface as a validation error rather than
/// a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarAttributeType {
    /// String type.
    S,
    /// Number type.
    N,
    /// Binary type.
    B,
    /// An unknown attribute type received from the client.
    Unknown(String),
}

impl ScalarAttributeType {
    /// Returns the wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Returns `true` if this is a valid key attribute type.
    #[must_use]
    pub fn is_valid_key_type(&self) -> bool {
        matches!(self, Self::S | Self::N | Self::B)
    }

    /// Returns `true` if the given attribute value matches this scalar type.
    #[must_use]
    pub fn matches(&self, value: &crate::AttributeValue) -> bool {
        matches!(
            (self, value),
            (Self::S, crate::AttributeValue::S(_))
                | (Self::N, crate::AttributeValue::N(_))
                | (Self::B, crate::AttributeValue::B(_))
        )
    }
}

impl Serialize for ScalarAttributeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScalarAttributeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "S" => Ok(Self::S),
            "N" => Ok(Self::N),
            "B" => Ok(Self::B),
            _ => Ok(Self::Unknown(s)),
        }
    }
}

impl std::fmt::Display for ScalarAttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing mode for a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingMode {
    /// Fixed read/write capacity with a token-bucket rate limiter.
    #[serde(rename = "PROVISIONED")]
    Provisioned,
    /// No capacity limits.
    #[default]
    #[serde(rename = "PAY_PER_REQUEST")]
    PayPerRequest,
}

/// Current status of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableStatus {
    /// The table is ready for use.
    #[serde(rename = "ACTIVE")]
    Active,
    /// The table is being deleted.
    #[serde(rename = "DELETING")]
    Deleting,
}

/// Attribute projection kind for a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionType {
    /// Project the full item.
    #[serde(rename = "ALL")]
    All,
    /// Project only the table and index key attributes.
    #[serde(rename = "KEYS_ONLY")]
    KeysOnly,
    /// Project keys plus a named set of non-key attributes.
    #[serde(rename = "INCLUDE")]
    Include,
}

/// What `Put`/`Delete`/`Update` should return about the affected item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnValue {
    /// Return nothing (default).
    #[default]
    #[serde(rename = "NONE")]
    None,
    /// Return the item as it was before the operation.
    #[serde(rename = "ALL_OLD")]
    AllOld,
    /// Return the item as it is after the operation (`Update` only).
    #[serde(rename = "ALL_NEW")]
    AllNew,
}

// ---------------------------------------------------------------------------
// Wire structs
// ---------------------------------------------------------------------------

/// A single element of a table or index key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    /// The name of the key attribute.
    pub attribute_name: String,
    /// Whether this is the partition (`HASH`) or sort (`RANGE`) key.
    pub key_type: KeyType,
}

/// Declares the type of an attribute referenced by a key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    /// The attribute name.
    pub attribute_name: String,
    /// The scalar type of the attribute.
    pub attribute_type: ScalarAttributeType,
}

/// Provisioned read/write capacity for a table or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    /// Read capacity units per second.
    pub read_capacity_units: i64,
    /// Write capacity units per second.
    pub write_capacity_units: i64,
}

/// Attribute projection specification for a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    /// The projection kind.
    pub projection_type: ProjectionType,
    /// Non-key attributes to project when the kind is `INCLUDE`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_key_attributes: Vec<String>,
}

/// Wire-level global secondary index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndex {
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

// ---------------------------------------------------------------------------
// Parsed internal forms
// ---------------------------------------------------------------------------

/// A parsed key attribute: name plus its required scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// The attribute name.
    pub attribute_name: String,
    /// The scalar type key values must have.
    pub attribute_type: ScalarAttributeType,
}

/// A parsed attribute projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexProjection {
    /// Project the full item.
    All,
    /// Project only the table and index key attributes.
    KeysOnly,
    /// Project keys plus the named non-key attributes.
    Include(Vec<String>),
}

/// A parsed global secondary index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSecondaryIndexSetting {
    /// The index name, unique within the table.
    pub index_name: String,
    /// The index partition key.
    pub partition_key: KeySchema,
    /// The optional index sort key.
    pub sort_key: Option<KeySchema>,
    /// Which attributes are materialized into index rows.
    pub projection: IndexProjection,
    /// Optional provisioned throughput for the index read limiter.
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

// ---------------------------------------------------------------------------
// Descriptions
// ---------------------------------------------------------------------------

/// Description of a global secondary index, returned by `DescribeTable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndexDescription {
    /// The index name.
    pub index_name: String,
    /// The index key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// The attribute projection.
    pub projection: Projection,
    /// Provisioned throughput, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// The index ARN.
    pub index_arn: String,
}

/// Description of a table, returned by `DescribeTable` and table lifecycle
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDescription {
    /// The table name.
    pub table_name: String,
    /// The table status.
    pub table_status: TableStatus,
    /// The table key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// The attribute definitions backing the key schema.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// The billing mode.
    pub billing_mode: BillingMode,
    /// Provisioned throughput, if the billing mode is `PROVISIONED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Global secondary index descriptions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndexDescription>,
    /// Number of items currently stored.
    pub item_count: i64,
    /// Creation time as epoch seconds.
    pub creation_date_time: f64,
    /// Stable table id (UUID v4), assigned at creation time.
    pub table_id: String,
    /// The table ARN.
    pub table_arn: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_key_schema_element() {
        let elem = KeySchemaElement {
            attribute_name: "year".to_owned(),
            key_type: KeyType::Hash,
        };
        let json = serde_json::to_string(&elem).unwrap();
        assert_eq!(json, r#"{"AttributeName":"year","KeyType":"HASH"}"#);
    }

    #[test]
    fn test_should_deserialize_unknown_scalar_type() {
        let t: ScalarAttributeType = serde_json::from_str(r#""X""#).unwrap();
        assert!(matches!(t, ScalarAttributeType::Unknown(ref s) if s == "X"));
        assert!(!t.is_valid_key_type());
    }

    #[test]
    fn test_should_match_scalar_type_against_value() {
        let t = ScalarAttributeType::N;
        assert!(t.matches(&crate::AttributeValue::N("1".to_owned())));
        assert!(!t.matches(&crate::AttributeValue::S("1".to_owned())));
    }

    #[test]
    fn test_should_deserialize_billing_mode() {
        let m: BillingMode = serde_json::from_str(r#""PROVISIONED""#).unwrap();
        assert_eq!(m, BillingMode::Provisioned);
        assert_eq!(BillingMode::default(), BillingMode::PayPerRequest);
    }

    #[test]
    fn test_should_roundtrip_gsi_definition() {
        let gsi = GlobalSecondaryIndex {
            index_name: "regionGSI".to_owned(),
            key_schema: vec![KeySchemaElement {
                attribute_name: "regionCode".to_owned(),
                key_type: KeyType::Hash,
            }],
            projection: Projection {
                projection_type: ProjectionType::Include,
                non_key_attributes: vec!["message".to_owned()],
            },
            provisioned_throughput: None,
        };
        let json = serde_json::to_string(&gsi).unwrap();
        let back: GlobalSecondaryIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(gsi, back);
    }
}
