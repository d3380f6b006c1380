//! The stored record type and document-path addressing.
//!
//! An [`Entry`] is the record stored under a primary key: a mapping of
//! attribute name to [`AttributeValue`]. A [`PathOperand`] identifies a
//! location inside the (possibly nested) document and is the unit the
//! expression evaluator reads and writes through.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when a document path cannot be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path segment addressed a field on a value that is not a map.
    #[error("document path segment '{segment}' is not a map")]
    NotAMap {
        /// Display form of the offending segment.
        segment: String,
    },
    /// A path segment indexed into a value that is not a list.
    #[error("document path segment '{segment}' is not a list")]
    NotAList {
        /// Display form of the offending segment.
        segment: String,
    },
    /// A list index is past the end of the list (append is only allowed at
    /// exactly the current length).
    #[error("list index {index} is out of range for a list of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The current list length.
        len: usize,
    },
    /// An intermediate path segment does not exist in the document.
    #[error("document path segment '{segment}' does not exist")]
    MissingSegment {
        /// Display form of the missing segment.
        segment: String,
    },
}

// ---------------------------------------------------------------------------
// PathOperand
// ---------------------------------------------------------------------------

/// A location within a nested document.
///
/// Paths are left-nested: `a.b[2].c` is
/// `Dot(Index(Dot(Name("a"), "b"), 2), "c")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOperand {
    /// A top-level attribute name.
    Name(String),
    /// A list element of the base path.
    Index(Box<PathOperand>, usize),
    /// A map field of the base path.
    Dot(Box<PathOperand>, String),
}

impl PathOperand {
    /// Returns the top-level attribute name this path starts at.
    #[must_use]
    pub fn root(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Index(base, _) | Self::Dot(base, _) => base.root(),
        }
    }

    /// Returns `true` if this path addresses a top-level attribute.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        matches!(self, Self::Name(_))
    }
}

impl fmt::Display for PathOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Index(base, idx) => write!(f, "{base}[{idx}]"),
            Self::Dot(base, field) => write!(f, "{base}.{field}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// The record stored under a primary key.
///
/// Cloning an entry deep-copies the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry {
    attributes: HashMap<String, AttributeValue>,
}

impl Entry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of top-level attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if the entry has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns a top-level attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Inserts a top-level attribute, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        self.attributes.insert(name.into(), value)
    }

    /// Removes a top-level attribute.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    /// Returns `true` if a top-level attribute with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Iterates over the top-level attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }

    /// Returns the underlying attribute map.
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }

    /// Deep semantic equality over all attributes.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .all(|(k, v)| other.attributes.get(k).is_some_and(|w| v.equal(w)))
    }

    /// Resolves a path to the value it addresses, if present.
    #[must_use]
    pub fn get_path(&self, path: &PathOperand) -> Option<&AttributeValue> {
        match path {
            PathOperand::Name(name) => self.attributes.get(name),
            PathOperand::Index(base, idx) => match self.get_path(base)? {
                AttributeValue::L(list) => list.get(*idx),
                _ => None,
            },
            PathOperand::Dot(base, field) => match self.get_path(base)? {
                AttributeValue::M(map) => map.get(field),
                _ => None,
            },
        }
    }

    /// Writes a value at the given path.
    ///
    /// A top-level name creates or replaces the attribute. A dotted segment
    /// requires the base to resolve to a map. An indexed segment requires the
    /// base to resolve to a list; index `len` appends, indices past `len`
    /// fail.
    ///
    /// # Errors
    ///
    /// Returns `PathError` if an intermediate segment is missing or has the
    /// wrong shape, or if a list index is out of range.
    pub fn set_path(&mut self, path: &PathOperand, value: AttributeValue) -> Result<(), PathError> {
        match path {
            PathOperand::Name(name) => {
                self.attributes.insert(name.clone(), value);
                Ok(())
            }
            PathOperand::Index(base, idx) => {
                let segment = path.to_string();
                let target = self.locate_mut(base)?;
                let AttributeValue::L(list) = target else {
                    return Err(PathError::NotAList { segment });
                };
                if *idx < list.len() {
                    list[*idx] = value;
                    Ok(())
                } else if *idx == list.len() {
                    list.push(value);
                    Ok(())
                } else {
                    Err(PathError::IndexOutOfRange {
                        index: *idx,
                        len: list.len(),
                    })
                }
            }
            PathOperand::Dot(base, field) => {
                let segment = path.to_string();
                let target = self.locate_mut(base)?;
                let AttributeValue::M(map) = target else {
                    return Err(PathError::NotAMap { segment });
                };
                map.insert(field.clone(), value);
                Ok(())
            }
        }
    }

    /// Removes the value at the given path. Non-existent paths are a no-op
    /// that returns `None`.
    pub fn remove_path(&mut self, path: &PathOperand) -> Option<AttributeValue> {
        match path {
            PathOperand::Name(name) => self.attributes.remove(name),
            PathOperand::Index(base, idx) => match self.locate_mut(base).ok()? {
                AttributeValue::L(list) if *idx < list.len() => Some(list.remove(*idx)),
                _ => None,
            },
            PathOperand::Dot(base, field) => match self.locate_mut(base).ok()? {
                AttributeValue::M(map) => map.remove(field),
                _ => None,
            },
        }
    }

    /// Resolves a path to a mutable reference to the existing value.
    fn locate_mut(&mut self, path: &PathOperand) -> Result<&mut AttributeValue, PathError> {
        match path {
            PathOperand::Name(name) => {
                self.attributes
                    .get_mut(name)
                    .ok_or_else(|| PathError::MissingSegment {
                        segment: name.clone(),
                    })
            }
            PathOperand::Index(base, idx) => {
                let segment = path.to_string();
                match self.locate_mut(base)? {
                    AttributeValue::L(list) => {
                        let len = list.len();
                        list.get_mut(*idx).ok_or(PathError::IndexOutOfRange {
                            index: *idx,
                            len,
                        })
                    }
                    _ => Err(PathError::NotAList { segment }),
                }
            }
            PathOperand::Dot(base, field) => {
                let segment = path.to_string();
                match self.locate_mut(base)? {
                    AttributeValue::M(map) => {
                        map.get_mut(field).ok_or(PathError::MissingSegment { segment })
                    }
                    _ => Err(PathError::NotAMap { segment }),
                }
            }
        }
    }
}

impl From<HashMap<String, AttributeValue>> for Entry {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}

impl From<Entry> for HashMap<String, AttributeValue> {
    fn from(entry: Entry) -> Self {
        entry.attributes
    }
}

impl FromIterator<(String, AttributeValue)> for Entry {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> PathOperand {
        PathOperand::Name(s.to_owned())
    }

    fn dot(base: PathOperand, field: &str) -> PathOperand {
        PathOperand::Dot(Box::new(base), field.to_owned())
    }

    fn index(base: PathOperand, idx: usize) -> PathOperand {
        PathOperand::Index(Box::new(base), idx)
    }

    fn sample_entry() -> Entry {
        let mut info = HashMap::new();
        info.insert("rating".to_owned(), AttributeValue::N("8".to_owned()));
        info.insert(
            "genres".to_owned(),
            AttributeValue::L(vec![
                AttributeValue::S("drama".to_owned()),
                AttributeValue::S("comedy".to_owned()),
            ]),
        );

        let mut entry = Entry::new();
        entry.insert("title", AttributeValue::S("Hello".to_owned()));
        entry.insert("info", AttributeValue::M(info));
        entry
    }

    #[test]
    fn test_should_get_top_level_attribute() {
        let entry = sample_entry();
        assert_eq!(
            entry.get_path(&name("title")),
            Some(&AttributeValue::S("Hello".to_owned()))
        );
        assert!(entry.get_path(&name("missing")).is_none());
    }

    #[test]
    fn test_should_get_nested_path() {
        let entry = sample_entry();
        let path = dot(name("info"), "rating");
        assert_eq!(
            entry.get_path(&path),
            Some(&AttributeValue::N("8".to_owned()))
        );

        let path = index(dot(name("info"), "genres"), 1);
        assert_eq!(
            entry.get_path(&path),
            Some(&AttributeValue::S("comedy".to_owned()))
        );
    }

    #[test]
    fn test_should_set_nested_map_field() {
        let mut entry = sample_entry();
        let path = dot(name("info"), "rating");
        entry
            .set_path(&path, AttributeValue::N("9".to_owned()))
            .unwrap();
        assert_eq!(
            entry.get_path(&path),
            Some(&AttributeValue::N("9".to_owned()))
        );
    }

    #[test]
    fn test_should_append_at_list_end() {
        let mut entry = sample_entry();
        let path = index(dot(name("info"), "genres"), 2);
        entry
            .set_path(&path, AttributeValue::S("noir".to_owned()))
            .unwrap();
        assert_eq!(
            entry.get_path(&path),
            Some(&AttributeValue::S("noir".to_owned()))
        );
    }

    #[test]
    fn test_should_reject_index_past_end() {
        let mut entry = sample_entry();
        let path = index(dot(name("info"), "genres"), 5);
        let err = entry
            .set_path(&path, AttributeValue::S("noir".to_owned()))
            .unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn test_should_reject_dot_into_non_map() {
        let mut entry = sample_entry();
        let path = dot(name("title"), "x");
        let err = entry
            .set_path(&path, AttributeValue::S("v".to_owned()))
            .unwrap_err();
        assert!(matches!(err, PathError::NotAMap { .. }));
    }

    #[test]
    fn test_should_reject_set_through_missing_segment() {
        let mut entry = sample_entry();
        let path = dot(dot(name("info"), "nope"), "deep");
        let err = entry
            .set_path(&path, AttributeValue::S("v".to_owned()))
            .unwrap_err();
        assert!(matches!(err, PathError::MissingSegment { .. }));
    }

    #[test]
    fn test_should_remove_paths() {
        let mut entry = sample_entry();

        let removed = entry.remove_path(&dot(name("info"), "rating"));
        assert_eq!(removed, Some(AttributeValue::N("8".to_owned())));
        assert!(entry.get_path(&dot(name("info"), "rating")).is_none());

        // Removing a list element shifts the remainder down.
        let removed = entry.remove_path(&index(dot(name("info"), "genres"), 0));
        assert_eq!(removed, Some(AttributeValue::S("drama".to_owned())));
        assert_eq!(
            entry.get_path(&index(dot(name("info"), "genres"), 0)),
            Some(&AttributeValue::S("comedy".to_owned()))
        );

        // Removing a non-existent path is a no-op.
        assert!(entry.remove_path(&name("missing")).is_none());
    }

    #[test]
    fn test_should_display_paths() {
        let path = index(dot(name("info"), "genres"), 1);
        assert_eq!(path.to_string(), "info.genres[1]");
        assert_eq!(path.root(), "info");
    }

    #[test]
    fn test_should_deep_clone() {
        let entry = sample_entry();
        let mut copy = entry.clone();
        copy.set_path(
            &dot(name("info"), "rating"),
            AttributeValue::N("1".to_owned()),
        )
        .unwrap();
        // The original is untouched.
        assert_eq!(
            entry.get_path(&dot(name("info"), "rating")),
            Some(&AttributeValue::N("8".to_owned()))
        );
        assert!(!entry.equal(&copy));
    }

    #[test]
    fn test_should_serialize_as_plain_map() {
        let mut entry = Entry::new();
        entry.insert("year", AttributeValue::N("2025".to_owned()));
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"year":{"N":"2025"}}"#);
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert!(back.equal(&entry));
    }
}
