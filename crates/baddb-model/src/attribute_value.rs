//! The `AttributeValue` tagged union with custom serialization.
//!
//! `AttributeValue` is a sum type where exactly one variant is present.
//! The JSON wire format uses single-key objects like `{"S": "hello"}`.
//! Numbers are always string-encoded to preserve the caller's notation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tolerance used when two number values are compared for ordering.
///
/// Equality checks (`equal`) compare the lexical string forms instead; see
/// the crate-level documentation for the rationale.
pub const NUMBER_EPSILON: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when two attribute values cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    /// The value's type does not define an ordering (sets, lists, maps, null).
    #[error("values of type {type_descriptor} do not support ordering")]
    Unorderable {
        /// Type descriptor of the offending value.
        type_descriptor: &'static str,
    },
    /// The two operands have different types.
    #[error("cannot compare {left} with {right}")]
    MismatchedTypes {
        /// Type descriptor of the left operand.
        left: &'static str,
        /// Type descriptor of the right operand.
        right: &'static str,
    },
    /// A number value failed to parse as a finite double.
    #[error("'{value}' is not a valid number")]
    InvalidNumber {
        /// The offending number string.
        value: String,
    },
}

// ---------------------------------------------------------------------------
// AttributeValue
// ---------------------------------------------------------------------------

/// A single typed attribute value.
///
/// Exactly one variant is populated. `SS`/`NS` are semantically unordered
/// unique-element collections even though they are stored as vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Binary value (base64-encoded in JSON).
    B(bytes::Bytes),
    /// Boolean value.
    Bool(bool),
    /// Ordered list of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute name to attribute value.
    M(HashMap<String, AttributeValue>),
    /// Number value (string-encoded decimal).
    N(String),
    /// Number Set (string-encoded).
    Ns(Vec<String>),
    /// Null value.
    Null,
    /// String value.
    S(String),
    /// String Set.
    Ss(Vec<String>),
}

impl AttributeValue {
    /// Returns the type descriptor string (e.g., "S", "N", "BOOL").
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::B(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::L(_) => "L",
            Self::M(_) => "M",
            Self::N(_) => "N",
            Self::Ns(_) => "NS",
            Self::Null => "NULL",
            Self::S(_) => "S",
            Self::Ss(_) => "SS",
        }
    }

    /// Returns the string value if this is an `S` variant.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number string if this is an `N` variant.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the binary payload if this is a `B` variant.
    #[must_use]
    pub fn as_b(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::B(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Bool` variant.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the list if this is an `L` variant.
    #[must_use]
    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the map if this is an `M` variant.
    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the byte encoding used for primary-key storage.
    ///
    /// Defined only for the key-eligible variants `B`, `BOOL`, `N`, and `S`;
    /// all other variants return `None`.
    #[must_use]
    pub fn key_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::B(b) => Some(b.to_vec()),
            Self::Bool(b) => Some(vec![u8::from(*b)]),
            Self::N(n) => Some(n.as_bytes().to_vec()),
            Self::S(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        }
    }

    /// Validates that an `N` value parses as a finite double.
    ///
    /// # Errors
    ///
    /// Returns `CompareError::InvalidNumber` if the string is not a finite
    /// number. Non-number variants validate trivially.
    pub fn validate_number(&self) -> Result<(), CompareError> {
        if let Self::N(n) = self {
            parse_number(n)?;
        }
        Ok(())
    }

    /// Orders two attribute values.
    ///
    /// Strings and binary order lexically, booleans order `false < true`,
    /// and numbers order numerically with a tolerance of [`NUMBER_EPSILON`].
    ///
    /// # Errors
    ///
    /// Returns `CompareError::Unorderable` for sets, lists, maps, and null,
    /// and `CompareError::MismatchedTypes` when the operand types differ.
    pub fn compare(&self, other: &Self) -> Result<Ordering, CompareError> {
        match (self, other) {
            (Self::B(a), Self::B(b)) => Ok(a.as_ref().cmp(b.as_ref())),
            (Self::Bool(a), Self::Bool(b)) => Ok(a.cmp(b)),
            (Self::N(a), Self::N(b)) => {
                let fa = parse_number(a)?;
                let fb = parse_number(b)?;
                if (fa - fb).abs() < NUMBER_EPSILON {
                    Ok(Ordering::Equal)
                } else if fa < fb {
                    Ok(Ordering::Less)
                } else {
                    Ok(Ordering::Greater)
                }
            }
            (Self::S(a), Self::S(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            (a, b) if a.type_descriptor() == b.type_descriptor() => Err(CompareError::Unorderable {
                type_descriptor: a.type_descriptor(),
            }),
            (a, b) => Err(CompareError::MismatchedTypes {
                left: a.type_descriptor(),
                right: b.type_descriptor(),
            }),
        }
    }

    /// Deep semantic equality.
    ///
    /// Sets compare order-independently, numbers compare by their lexical
    /// string form, lists compare element-wise in order, and maps compare
    /// key-wise. Different types are never equal.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::B(a), Self::B(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::L(a), Self::L(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            (Self::M(a), Self::M(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.equal(w)))
            }
            (Self::N(a), Self::N(b)) | (Self::S(a), Self::S(b)) => a == b,
            (Self::Ns(a), Self::Ns(b)) | (Self::Ss(a), Self::Ss(b)) => set_equal(a, b),
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

/// Order-independent equality for string/number sets.
fn set_equal(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|item| b.contains(item))
}

/// Parse a number string into a finite double.
fn parse_number(s: &str) -> Result<f64, CompareError> {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(CompareError::InvalidNumber {
            value: s.to_owned(),
        }),
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::Ns(v) => write!(f, "{{NS: {v:?}}}"),
            Self::Null => write!(f, "{{NULL}}"),
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::Ss(v) => write!(f, "{{SS: {v:?}}}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::B(b) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(b);
                map.serialize_entry("B", &encoded)?;
            }
            Self::Bool(b) => map.serialize_entry("BOOL", b)?,
            Self::L(list) => map.serialize_entry("L", list)?,
            Self::M(m) => map.serialize_entry("M", m)?,
            Self::N(n) => map.serialize_entry("N", n)?,
            Self::Ns(v) => map.serialize_entry("NS", v)?,
            Self::Null => map.serialize_entry("NULL", &true)?,
            Self::S(s) => map.serialize_entry("S", s)?,
            Self::Ss(v) => map.serialize_entry("SS", v)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an AttributeValue object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom(
                "AttributeValue must have exactly one key",
            ));
        };

        let value = match key.as_str() {
            "B" => {
                use base64::Engine;
                let encoded: String = map.next_value()?;
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(&encoded)
                    .map_err(de::Error::custom)?;
                AttributeValue::B(bytes::Bytes::from(decoded))
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "NS" => AttributeValue::Ns(map.next_value()?),
            "NULL" => {
                let _: bool = map.next_value()?;
                AttributeValue::Null
            }
            "S" => AttributeValue::S(map.next_value()?),
            "SS" => AttributeValue::Ss(map.next_value()?),
            other => {
                return Err(de::Error::unknown_field(
                    other,
                    &["B", "BOOL", "L", "M", "N", "NS", "NULL", "S", "SS"],
                ));
            }
        };

        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_string_value() {
        let val = AttributeValue::S("hello".to_owned());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"S":"hello"}"#);
    }

    #[test]
    fn test_should_serialize_number_value() {
        let val = AttributeValue::N("42".to_owned());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"N":"42"}"#);
    }

    #[test]
    fn test_should_serialize_null_value() {
        let val = AttributeValue::Null;
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"NULL":true}"#);
    }

    #[test]
    fn test_should_roundtrip_binary_value() {
        let val = AttributeValue::B(bytes::Bytes::from_static(b"test data"));
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }

    #[test]
    fn test_should_roundtrip_map_value() {
        let mut m = HashMap::new();
        m.insert("key".to_owned(), AttributeValue::S("value".to_owned()));
        m.insert("count".to_owned(), AttributeValue::N("3".to_owned()));
        let val = AttributeValue::M(m);
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }

    #[test]
    fn test_should_deserialize_sets() {
        let val: AttributeValue = serde_json::from_str(r#"{"SS":["a","b"]}"#).unwrap();
        assert!(matches!(val, AttributeValue::Ss(ref v) if v.len() == 2));

        let val: AttributeValue = serde_json::from_str(r#"{"NS":["1","2","3"]}"#).unwrap();
        assert!(matches!(val, AttributeValue::Ns(ref v) if v.len() == 3));
    }

    #[test]
    fn test_should_reject_unknown_type_key() {
        let result: Result<AttributeValue, _> = serde_json::from_str(r#"{"X":"oops"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_compare_strings_lexically() {
        let a = AttributeValue::S("abc".to_owned());
        let b = AttributeValue::S("abd".to_owned());
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
        assert_eq!(b.compare(&a).unwrap(), Ordering::Greater);
        assert_eq!(a.compare(&a).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_should_compare_numbers_numerically() {
        let a = AttributeValue::N("2".to_owned());
        let b = AttributeValue::N("10".to_owned());
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);

        // Within epsilon: treated as equal.
        let c = AttributeValue::N("1.00001".to_owned());
        let d = AttributeValue::N("1.00002".to_owned());
        assert_eq!(c.compare(&d).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_should_compare_booleans_false_before_true() {
        let f = AttributeValue::Bool(false);
        let t = AttributeValue::Bool(true);
        assert_eq!(f.compare(&t).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_should_error_on_unorderable_types() {
        let a = AttributeValue::Ss(vec!["a".to_owned()]);
        let b = AttributeValue::Ss(vec!["b".to_owned()]);
        assert!(matches!(
            a.compare(&b),
            Err(CompareError::Unorderable {
                type_descriptor: "SS"
            })
        ));

        let l = AttributeValue::L(vec![]);
        assert!(matches!(
            l.compare(&l.clone()),
            Err(CompareError::Unorderable {
                type_descriptor: "L"
            })
        ));

        assert!(matches!(
            AttributeValue::Null.compare(&AttributeValue::Null),
            Err(CompareError::Unorderable { .. })
        ));
    }

    #[test]
    fn test_should_error_on_mismatched_types() {
        let a = AttributeValue::S("1".to_owned());
        let b = AttributeValue::N("1".to_owned());
        assert!(matches!(
            a.compare(&b),
            Err(CompareError::MismatchedTypes {
                left: "S",
                right: "N"
            })
        ));
    }

    #[test]
    fn test_should_error_on_invalid_number() {
        let a = AttributeValue::N("abc".to_owned());
        let b = AttributeValue::N("1".to_owned());
        assert!(matches!(
            a.compare(&b),
            Err(CompareError::InvalidNumber { .. })
        ));
        assert!(a.validate_number().is_err());
        assert!(b.validate_number().is_ok());
    }

    #[test]
    fn test_should_equal_numbers_lexically() {
        // Numeric comparison treats "1" and "1.0" as equal, but equality is
        // defined on the lexical string form.
        let a = AttributeValue::N("1".to_owned());
        let b = AttributeValue::N("1.0".to_owned());
        assert!(!a.equal(&b));
        assert_eq!(a.compare(&b).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_should_equal_sets_order_independently() {
        let a = AttributeValue::Ss(vec!["x".to_owned(), "y".to_owned()]);
        let b = AttributeValue::Ss(vec!["y".to_owned(), "x".to_owned()]);
        assert!(a.equal(&b));

        let c = AttributeValue::Ns(vec!["1".to_owned(), "2".to_owned()]);
        let d = AttributeValue::Ns(vec!["2".to_owned(), "1".to_owned()]);
        assert!(c.equal(&d));
    }

    #[test]
    fn test_should_equal_lists_in_order() {
        let a = AttributeValue::L(vec![
            AttributeValue::S("x".to_owned()),
            AttributeValue::S("y".to_owned()),
        ]);
        let b = AttributeValue::L(vec![
            AttributeValue::S("y".to_owned()),
            AttributeValue::S("x".to_owned()),
        ]);
        assert!(!a.equal(&b));
        assert!(a.equal(&a.clone()));
    }

    #[test]
    fn test_should_produce_key_bytes_for_key_types() {
        assert_eq!(
            AttributeValue::S("hi".to_owned()).key_bytes(),
            Some(b"hi".to_vec())
        );
        assert_eq!(
            AttributeValue::N("42".to_owned()).key_bytes(),
            Some(b"42".to_vec())
        );
        assert_eq!(AttributeValue::Bool(true).key_bytes(), Some(vec![1]));
        assert_eq!(
            AttributeValue::B(bytes::Bytes::from_static(&[7, 8])).key_bytes(),
            Some(vec![7, 8])
        );
        assert_eq!(AttributeValue::L(vec![]).key_bytes(), None);
        assert_eq!(AttributeValue::Null.key_bytes(), None);
    }

    #[test]
    fn test_should_clone_equal() {
        let mut m = HashMap::new();
        m.insert(
            "nested".to_owned(),
            AttributeValue::L(vec![AttributeValue::N("1".to_owned())]),
        );
        let val = AttributeValue::M(m);
        assert!(val.clone().equal(&val));
    }
}
