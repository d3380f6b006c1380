//! Binding and operand resolution shared by the condition and update
//! compilers.
//!
//! Binding happens once, at compile time: `#name` placeholders are replaced
//! through the attribute-name map, `:value` references are replaced by their
//! concrete values, and parsed flat paths become [`PathOperand`] trees. The
//! resulting bound operands capture everything they need, so evaluation
//! against an entry performs no further map lookups.

use std::collections::HashMap;

use baddb_model::{AttributeValue, Entry, PathOperand};

use super::ast::{AttributePath, CompareOp, Operand, PathElement};
use super::parser::ExpressionError;

/// An operand with all substitutions applied.
#[derive(Debug, Clone)]
pub enum BoundOperand {
    /// A document path into the entry under evaluation.
    Path(PathOperand),
    /// A concrete value from the attribute-value map.
    Value(AttributeValue),
    /// `size(operand)`.
    Size(Box<BoundOperand>),
}

/// Resolves a parsed path against the attribute-name map, producing the
/// model's recursive path form.
///
/// # Errors
///
/// Returns `ExpressionError::UnresolvedName` if a `#name` placeholder has no
/// mapping.
pub fn bind_path(
    path: &AttributePath,
    names: &HashMap<String, String>,
) -> Result<PathOperand, ExpressionError> {
    let mut iter = path.elements.iter();
    let first = iter.next().ok_or(ExpressionError::UnexpectedEof)?;
    let PathElement::Attribute(root) = first else {
        return Err(ExpressionError::Validation {
            message: "a document path must start with an attribute name".to_owned(),
        });
    };

    let mut bound = PathOperand::Name(resolve_name(root, names)?);
    for element in iter {
        bound = match element {
            PathElement::Attribute(name) => {
                PathOperand::Dot(Box::new(bound), resolve_name(name, names)?)
            }
            PathElement::Index(idx) => PathOperand::Index(Box::new(bound), *idx),
        };
    }
    Ok(bound)
}

/// Resolves a single path segment, mapping `#name` placeholders.
fn resolve_name(name: &str, names: &HashMap<String, String>) -> Result<String, ExpressionError> {
    if name.starts_with('#') {
        names
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnresolvedName {
                name: name.to_owned(),
            })
    } else {
        Ok(name.to_owned())
    }
}

/// Binds an operand against both substitution maps.
///
/// # Errors
///
/// Returns `ExpressionError` if a placeholder cannot be resolved.
pub fn bind_operand(
    operand: &Operand,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<BoundOperand, ExpressionError> {
    match operand {
        Operand::Path(path) => Ok(BoundOperand::Path(bind_path(path, names)?)),
        Operand::Value(name) => {
            let key = format!(":{name}");
            values
                .get(&key)
                .cloned()
                .map(BoundOperand::Value)
                .ok_or(ExpressionError::UnresolvedValue { name: key })
        }
        Operand::Size(inner) => Ok(BoundOperand::Size(Box::new(bind_operand(
            inner, names, values,
        )?))),
    }
}

/// Binds an operand that must be a document path (e.g. the first argument of
/// `attribute_exists`).
///
/// # Errors
///
/// Returns `ExpressionError::InvalidOperand` if the operand is not a path.
pub fn bind_path_operand(
    operand: &Operand,
    names: &HashMap<String, String>,
    operation: &str,
) -> Result<PathOperand, ExpressionError> {
    match operand {
        Operand::Path(path) => bind_path(path, names),
        other => Err(ExpressionError::InvalidOperand {
            operation: operation.to_owned(),
            message: format!("expected a document path, found {other:?}"),
        }),
    }
}

/// Resolves a bound operand against an entry.
///
/// A path that does not resolve yields `None`. `size()` of a missing path
/// also yields `None`; `size()` of a value without a length is an error.
///
/// # Errors
///
/// Returns `ExpressionError::TypeMismatch` when `size()` is applied to a
/// number, boolean, or null.
pub fn resolve(
    operand: &BoundOperand,
    entry: &Entry,
) -> Result<Option<AttributeValue>, ExpressionError> {
    match operand {
        BoundOperand::Path(path) => Ok(entry.get_path(path).cloned()),
        BoundOperand::Value(value) => Ok(Some(value.clone())),
        BoundOperand::Size(inner) => match resolve(inner, entry)? {
            Some(value) => {
                let size = attribute_size(&value)?;
                Ok(Some(AttributeValue::N(size.to_string())))
            }
            None => Ok(None),
        },
    }
}

/// Length of a value for `size()`: string/binary length, or element count
/// for sets, lists, and maps.
fn attribute_size(value: &AttributeValue) -> Result<usize, ExpressionError> {
    match value {
        AttributeValue::S(s) => Ok(s.len()),
        AttributeValue::B(b) => Ok(b.len()),
        AttributeValue::Ss(v) | AttributeValue::Ns(v) => Ok(v.len()),
        AttributeValue::L(v) => Ok(v.len()),
        AttributeValue::M(m) => Ok(m.len()),
        other => Err(ExpressionError::TypeMismatch {
            message: format!(
                "size() is not supported for values of type {}",
                other.type_descriptor()
            ),
        }),
    }
}

/// Evaluates a comparison between two resolved values.
///
/// Equality uses deep semantic equality (which never errors); ordering
/// defers to the value comparison rules and surfaces kind errors.
///
/// # Errors
///
/// Returns `ExpressionError::TypeMismatch` for ordering comparisons over
/// unorderable or mismatched types.
pub fn compare_values(
    left: &AttributeValue,
    right: &AttributeValue,
    op: CompareOp,
) -> Result<bool, ExpressionError> {
    match op {
        CompareOp::Eq => Ok(left.equal(right)),
        CompareOp::Ne => Ok(!left.equal(right)),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let ordering = left
                .compare(right)
                .map_err(|e| ExpressionError::TypeMismatch {
                    message: e.to_string(),
                })?;
            Ok(match op {
                CompareOp::Lt => ordering == std::cmp::Ordering::Less,
                CompareOp::Le => ordering != std::cmp::Ordering::Greater,
                CompareOp::Gt => ordering == std::cmp::Ordering::Greater,
                CompareOp::Ge => ordering != std::cmp::Ordering::Less,
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_condition;
    use super::*;

    fn names(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn first_operand(input: &str) -> Operand {
        let expr = parse_condition(input).unwrap();
        match expr {
            super::super::ast::Expr::Compare { left, .. } => *left,
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn test_should_bind_placeholder_paths() {
        let operand = first_operand("#a.#b[2] = :v");
        let bound = bind_path_operand(
            &operand,
            &names(&[("#a", "info"), ("#b", "genres")]),
            "test",
        )
        .unwrap();
        assert_eq!(bound.to_string(), "info.genres[2]");
    }

    #[test]
    fn test_should_fail_binding_unknown_placeholder() {
        let operand = first_operand("#missing = :v");
        let err = bind_path_operand(&operand, &HashMap::new(), "test").unwrap_err();
        assert!(matches!(err, ExpressionError::UnresolvedName { ref name } if name == "#missing"));
    }

    #[test]
    fn test_should_fail_binding_unknown_value() {
        let operand = Operand::Value("gone".to_owned());
        let err = bind_operand(&operand, &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::UnresolvedValue { ref name } if name == ":gone"));
    }

    #[test]
    fn test_should_resolve_size_of_collections() {
        let mut entry = Entry::new();
        entry.insert(
            "tags",
            AttributeValue::Ss(vec!["a".to_owned(), "b".to_owned()]),
        );
        entry.insert("name", AttributeValue::S("hello".to_owned()));
        entry.insert("views", AttributeValue::N("3".to_owned()));

        let size_of = |attr: &str| {
            resolve(
                &BoundOperand::Size(Box::new(BoundOperand::Path(PathOperand::Name(
                    attr.to_owned(),
                )))),
                &entry,
            )
        };

        assert_eq!(size_of("tags").unwrap(), Some(AttributeValue::N("2".to_owned())));
        assert_eq!(size_of("name").unwrap(), Some(AttributeValue::N("5".to_owned())));
        // size() of a number is a type error; of a missing path, None.
        assert!(size_of("views").is_err());
        assert_eq!(size_of("absent").unwrap(), None);
    }

    #[test]
    fn test_should_compare_with_equality_and_ordering() {
        let one = AttributeValue::N("1".to_owned());
        let two = AttributeValue::N("2".to_owned());
        assert!(compare_values(&one, &two, CompareOp::Lt).unwrap());
        assert!(compare_values(&one, &one, CompareOp::Eq).unwrap());
        assert!(compare_values(&one, &two, CompareOp::Ne).unwrap());

        // Equality across types is simply false; ordering is an error.
        let s = AttributeValue::S("1".to_owned());
        assert!(!compare_values(&one, &s, CompareOp::Eq).unwrap());
        assert!(compare_values(&one, &s, CompareOp::Lt).is_err());
    }
}
