//! Key-condition planning: turning a parsed key-condition expression into
//! the partition binding and sort-key predicate a query executes.
//!
//! A key condition is exactly one or two predicates joined by `AND`: an
//! equality on the partition key, and optionally one sort-key predicate
//! (`=`, `<`, `<=`, `>`, `>=`, `BETWEEN`, or `begins_with`). Predicate
//! order is not significant. Anything else is a validation error.

use std::cmp::Ordering;
use std::collections::HashMap;

use baddb_model::types::KeySchema;
use baddb_model::{AttributeValue, Entry, PathOperand};

use crate::error::{BaddbError, BaddbResult};
use crate::expression::ast::{CompareOp, Expr, FunctionName, LogicalOp, Operand};
use crate::expression::eval::{BoundOperand, bind_operand};
use crate::expression::parse_condition;

/// A bound key condition: the partition equality plus an optional sort-key
/// predicate.
#[derive(Debug, Clone)]
pub struct KeyCondition {
    /// The partition key value the query is pinned to.
    pub partition_value: AttributeValue,
    /// The sort-key predicate, if any.
    pub sort_predicate: Option<SortPredicate>,
}

/// A predicate over the sort-key attribute.
#[derive(Debug, Clone)]
pub enum SortPredicate {
    /// Sort key equals the value.
    Eq(AttributeValue),
    /// Sort key is strictly less than the value.
    Lt(AttributeValue),
    /// Sort key is at most the value.
    Le(AttributeValue),
    /// Sort key is strictly greater than the value.
    Gt(AttributeValue),
    /// Sort key is at least the value.
    Ge(AttributeValue),
    /// Sort key is within the inclusive range.
    Between(AttributeValue, AttributeValue),
    /// Sort key is a string with the given prefix.
    BeginsWith(String),
}

impl SortPredicate {
    /// Evaluates the predicate against a sort-key value.
    ///
    /// # Errors
    ///
    /// Returns `BaddbError::Validation` when the stored value cannot be
    /// compared with the predicate's operand.
    pub fn matches(&self, value: &AttributeValue) -> BaddbResult<bool> {
        match self {
            Self::Eq(expected) => Ok(value.compare(expected)? == Ordering::Equal),
            Self::Lt(bound) => Ok(value.compare(bound)? == Ordering::Less),
            Self::Le(bound) => Ok(value.compare(bound)? != Ordering::Greater),
            Self::Gt(bound) => Ok(value.compare(bound)? == Ordering::Greater),
            Self::Ge(bound) => Ok(value.compare(bound)? != Ordering::Less),
            Self::Between(low, high) => Ok(value.compare(low)? != Ordering::Less
                && value.compare(high)? != Ordering::Greater),
            Self::BeginsWith(prefix) => match value {
                AttributeValue::S(s) => Ok(s.starts_with(prefix.as_str())),
                other => Err(BaddbError::validation(format!(
                    "begins_with requires a string sort key, found {}",
                    other.type_descriptor()
                ))),
            },
        }
    }
}

/// Parses and binds a key-condition expression against the key schema of
/// the query target (base table or GSI).
///
/// # Errors
///
/// Returns `BaddbError::Validation` when the expression does not have the
/// required shape, targets non-key attributes, or binds to values of the
/// wrong type.
pub fn build_key_condition(
    expression: &str,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
    partition_key: &KeySchema,
    sort_key: Option<&KeySchema>,
) -> BaddbResult<KeyCondition> {
    let expr = parse_condition(expression).map_err(BaddbError::condition_expression)?;

    let mut partition_value: Option<AttributeValue> = None;
    let mut sort_predicate: Option<SortPredicate> = None;

    let predicates = split_and(&expr)?;
    if predicates.len() > 2 {
        return Err(BaddbError::validation(
            "a key condition supports at most two predicates",
        ));
    }

    for predicate in predicates {
        let (attribute, candidate) = build_predicate(predicate, names, values)?;
        if attribute == partition_key.attribute_name {
            if partition_value.is_some() {
                return Err(BaddbError::validation(
                    "the partition key may appear only once in a key condition",
                ));
            }
            let SortPredicate::Eq(value) = candidate else {
                return Err(BaddbError::validation(
                    "the partition key condition must be an equality",
                ));
            };
            if !partition_key.attribute_type.matches(&value) {
                return Err(BaddbError::validation(format!(
                    "key attribute '{attribute}' must be of type {}",
                    partition_key.attribute_type
                )));
            }
            partition_value = Some(value);
        } else if sort_key.is_some_and(|sk| sk.attribute_name == attribute) {
            if sort_predicate.is_some() {
                return Err(BaddbError::validation(
                    "the sort key may appear only once in a key condition",
                ));
            }
            sort_predicate = Some(candidate);
        } else {
            return Err(BaddbError::validation(format!(
                "attribute '{attribute}' is not a key attribute of the query target"
            )));
        }
    }

    let Some(partition_value) = partition_value else {
        return Err(BaddbError::validation(
            "a key condition requires an equality on the partition key",
        ));
    };

    Ok(KeyCondition {
        partition_value,
        sort_predicate,
    })
}

/// Flattens top-level `AND` nodes into a predicate list. `OR` and `NOT`
/// are not valid in key conditions.
fn split_and(expr: &Expr) -> BaddbResult<Vec<&Expr>> {
    match expr {
        Expr::Logical {
            op: LogicalOp::And,
            left,
            right,
        } => {
            let mut out = split_and(left)?;
            out.extend(split_and(right)?);
            Ok(out)
        }
        Expr::Logical {
            op: LogicalOp::Or, ..
        } => Err(BaddbError::validation("OR is not valid in a key condition")),
        Expr::Not(_) => Err(BaddbError::validation("NOT is not valid in a key condition")),
        other => Ok(vec![other]),
    }
}

/// Turns one predicate node into `(attribute name, predicate)`.
fn build_predicate(
    expr: &Expr,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> BaddbResult<(String, SortPredicate)> {
    match expr {
        Expr::Compare { left, op, right } => {
            let (attribute, value, reversed) = split_comparison(left, right, names, values)?;
            let op = if reversed { flip(*op) } else { *op };
            let predicate = match op {
                CompareOp::Eq => SortPredicate::Eq(value),
                CompareOp::Lt => SortPredicate::Lt(value),
                CompareOp::Le => SortPredicate::Le(value),
                CompareOp::Gt => SortPredicate::Gt(value),
                CompareOp::Ge => SortPredicate::Ge(value),
                CompareOp::Ne => {
                    return Err(BaddbError::validation(
                        "'<>' is not valid in a key condition",
                    ));
                }
            };
            Ok((attribute, predicate))
        }
        Expr::Between { value, low, high } => {
            let attribute = key_attribute_name(value, names)?;
            let low = constant_value(low, names, values)?;
            let high = constant_value(high, names, values)?;
            Ok((attribute, SortPredicate::Between(low, high)))
        }
        Expr::Function {
            name: FunctionName::BeginsWith,
            args,
        } if args.len() == 2 => {
            let attribute = key_attribute_name(&args[0], names)?;
            match constant_value(&args[1], names, values)? {
                AttributeValue::S(prefix) => Ok((attribute, SortPredicate::BeginsWith(prefix))),
                other => Err(BaddbError::validation(format!(
                    "begins_with requires a string value, found {}",
                    other.type_descriptor()
                ))),
            }
        }
        _ => Err(BaddbError::validation(
            "unsupported predicate in a key condition",
        )),
    }
}

/// Splits a comparison into the key side and the value side. Returns
/// `reversed = true` when the key was on the right.
fn split_comparison(
    left: &Operand,
    right: &Operand,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> BaddbResult<(String, AttributeValue, bool)> {
    if let Ok(attribute) = key_attribute_name(left, names) {
        Ok((attribute, constant_value(right, names, values)?, false))
    } else if let Ok(attribute) = key_attribute_name(right, names) {
        Ok((attribute, constant_value(left, names, values)?, true))
    } else {
        Err(BaddbError::validation(
            "a key condition predicate must reference a key attribute",
        ))
    }
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        other => other,
    }
}

/// An operand that must be a single top-level key attribute name.
fn key_attribute_name(
    operand: &Operand,
    names: &HashMap<String, String>,
) -> BaddbResult<String> {
    let bound = bind_operand(operand, names, &HashMap::new())
        .map_err(BaddbError::condition_expression)?;
    match bound {
        BoundOperand::Path(PathOperand::Name(name)) => Ok(name),
        _ => Err(BaddbError::validation(
            "a key condition predicate must reference a top-level key attribute",
        )),
    }
}

/// An operand that must be a `:value` reference.
fn constant_value(
    operand: &Operand,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> BaddbResult<AttributeValue> {
    let bound =
        bind_operand(operand, names, values).map_err(BaddbError::condition_expression)?;
    match bound {
        BoundOperand::Value(value) => Ok(value),
        _ => Err(BaddbError::validation(
            "key condition operands must be expression attribute values",
        )),
    }
}

/// Evaluates a sort predicate against an entry's sort attribute, treating a
/// missing attribute as a non-match.
///
/// # Errors
///
/// Propagates comparison kind errors from the predicate.
pub fn sort_matches(
    predicate: Option<&SortPredicate>,
    sort_attribute: Option<&str>,
    entry: &Entry,
) -> BaddbResult<bool> {
    let Some(predicate) = predicate else {
        return Ok(true);
    };
    let Some(attribute) = sort_attribute else {
        return Err(BaddbError::validation(
            "the query target has no sort key to apply a condition to",
        ));
    };
    match entry.get(attribute) {
        Some(value) => predicate.matches(value),
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
