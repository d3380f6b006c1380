//! Compiles update expressions into reusable update operations.
//!
//! An [`UpdateOperation`] is parsed and bound once. Applying it clones the
//! entry, runs the clauses in SET, REMOVE, ADD, DELETE order, and returns
//! the new entry; on any error the original entry is untouched, which is
//! what lets the engine swap in the result atomically.

use std::collections::HashMap;
use std::fmt;

use baddb_model::{AttributeValue, Entry, PathOperand};

use super::ast::{SetValue, UpdateExpr};
use super::eval::{BoundOperand, bind_operand, bind_path, resolve};
use super::parser::{ExpressionError, parse_update};

/// A bound SET value expression.
#[derive(Debug, Clone)]
enum BoundSetValue {
    Operand(BoundOperand),
    Plus(Box<BoundSetValue>, Box<BoundSetValue>),
    Minus(Box<BoundSetValue>, Box<BoundSetValue>),
    IfNotExists(PathOperand, BoundOperand),
    ListAppend(BoundOperand, BoundOperand),
}

/// A compiled update expression.
pub struct UpdateOperation {
    text: String,
    sets: Vec<(PathOperand, BoundSetValue)>,
    removes: Vec<PathOperand>,
    adds: Vec<(PathOperand, BoundOperand)>,
    deletes: Vec<(PathOperand, BoundOperand)>,
}

impl UpdateOperation {
    /// Parses, binds, and compiles an update expression.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` on a syntax error, a reserved word used as
    /// an identifier, or an unresolvable placeholder.
    pub fn new(
        text: &str,
        names: &HashMap<String, String>,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let update = parse_update(text)?;
        Self::bind(text, &update, names, values)
    }

    fn bind(
        text: &str,
        update: &UpdateExpr,
        names: &HashMap<String, String>,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let sets = update
            .set_actions
            .iter()
            .map(|action| {
                Ok((
                    bind_path(&action.path, names)?,
                    bind_set_value(&action.value, names, values)?,
                ))
            })
            .collect::<Result<Vec<_>, ExpressionError>>()?;

        let removes = update
            .remove_paths
            .iter()
            .map(|path| bind_path(path, names))
            .collect::<Result<Vec<_>, _>>()?;

        let adds = update
            .add_actions
            .iter()
            .map(|action| {
                Ok((
                    bind_path(&action.path, names)?,
                    bind_operand(&action.value, names, values)?,
                ))
            })
            .collect::<Result<Vec<_>, ExpressionError>>()?;

        let deletes = update
            .delete_actions
            .iter()
            .map(|action| {
                Ok((
                    bind_path(&action.path, names)?,
                    bind_operand(&action.value, names, values)?,
                ))
            })
            .collect::<Result<Vec<_>, ExpressionError>>()?;

        Ok(Self {
            text: text.to_owned(),
            sets,
            removes,
            adds,
            deletes,
        })
    }

    /// The original expression text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Applies the update to an entry, returning the updated copy.
    ///
    /// Clauses run in SET, REMOVE, ADD, DELETE order. SET operands resolve
    /// against the entry as it was before the update.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` on any type mismatch or invalid path; the
    /// input entry is never partially modified.
    pub fn apply(&self, entry: &Entry) -> Result<Entry, ExpressionError> {
        let mut out = entry.clone();

        for (path, value) in &self.sets {
            let resolved = resolve_set_value(value, entry)?;
            out.set_path(path, resolved)
                .map_err(|e| ExpressionError::Validation {
                    message: e.to_string(),
                })?;
        }

        for path in &self.removes {
            // Removing a non-existent path is a no-op.
            out.remove_path(path);
        }

        for (path, operand) in &self.adds {
            apply_add(&mut out, path, operand)?;
        }

        for (path, operand) in &self.deletes {
            apply_delete(&mut out, path, operand)?;
        }

        Ok(out)
    }
}

impl fmt::Debug for UpdateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOperation")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

fn bind_set_value(
    value: &SetValue,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<BoundSetValue, ExpressionError> {
    Ok(match value {
        SetValue::Operand(op) => BoundSetValue::Operand(bind_operand(op, names, values)?),
        SetValue::Plus(a, b) => BoundSetValue::Plus(
            Box::new(bind_set_value(a, names, values)?),
            Box::new(bind_set_value(b, names, values)?),
        ),
        SetValue::Minus(a, b) => BoundSetValue::Minus(
            Box::new(bind_set_value(a, names, values)?),
            Box::new(bind_set_value(b, names, values)?),
        ),
        SetValue::IfNotExists(path, default) => BoundSetValue::IfNotExists(
            bind_path(path, names)?,
            bind_operand(default, names, values)?,
        ),
        SetValue::ListAppend(a, b) => BoundSetValue::ListAppend(
            bind_operand(a, names, values)?,
            bind_operand(b, names, values)?,
        ),
    })
}

fn resolve_set_value(
    value: &BoundSetValue,
    entry: &Entry,
) -> Result<AttributeValue, ExpressionError> {
    match value {
        BoundSetValue::Operand(operand) => {
            resolve(operand, entry)?.ok_or_else(|| ExpressionError::InvalidOperand {
                operation: "SET".to_owned(),
                message: "operand does not resolve to a value".to_owned(),
            })
        }
        BoundSetValue::Plus(a, b) => {
            let av = resolve_set_value(a, entry)?;
            let bv = resolve_set_value(b, entry)?;
            numeric_arithmetic(&av, &bv, true)
        }
        BoundSetValue::Minus(a, b) => {
            let av = resolve_set_value(a, entry)?;
            let bv = resolve_set_value(b, entry)?;
            numeric_arithmetic(&av, &bv, false)
        }
        BoundSetValue::IfNotExists(path, default) => match entry.get_path(path) {
            Some(existing) => Ok(existing.clone()),
            None => resolve(default, entry)?.ok_or_else(|| ExpressionError::InvalidOperand {
                operation: "if_not_exists".to_owned(),
                message: "default operand does not resolve to a value".to_owned(),
            }),
        },
        BoundSetValue::ListAppend(a, b) => {
            let av = resolve(a, entry)?;
            let bv = resolve(b, entry)?;
            match (av, bv) {
                (Some(AttributeValue::L(mut left)), Some(AttributeValue::L(right))) => {
                    left.extend(right);
                    Ok(AttributeValue::L(left))
                }
                (av, bv) => Err(ExpressionError::TypeMismatch {
                    message: format!(
                        "list_append requires two list operands, found {} and {}",
                        type_of(av.as_ref()),
                        type_of(bv.as_ref())
                    ),
                }),
            }
        }
    }
}

fn type_of(value: Option<&AttributeValue>) -> &'static str {
    value.map_or("nothing", AttributeValue::type_descriptor)
}

/// `ADD path value`: numeric addition for numbers, union for sets.
fn apply_add(
    out: &mut Entry,
    path: &PathOperand,
    operand: &BoundOperand,
) -> Result<(), ExpressionError> {
    let add_value = resolve(operand, out)?.ok_or_else(|| ExpressionError::InvalidOperand {
        operation: "ADD".to_owned(),
        message: "value operand does not resolve to a value".to_owned(),
    })?;

    let result = match (&add_value, out.get_path(path)) {
        (AttributeValue::N(delta), None) => AttributeValue::N(delta.clone()),
        (AttributeValue::N(delta), Some(AttributeValue::N(current))) => {
            numeric_arithmetic(
                &AttributeValue::N(current.clone()),
                &AttributeValue::N(delta.clone()),
                true,
            )?
        }
        (AttributeValue::Ss(additions), None) => AttributeValue::Ss(dedupe(additions)),
        (AttributeValue::Ss(additions), Some(AttributeValue::Ss(current))) => {
            let mut merged = current.clone();
            for item in additions {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            AttributeValue::Ss(merged)
        }
        (AttributeValue::Ns(additions), None) => AttributeValue::Ns(dedupe(additions)),
        (AttributeValue::Ns(additions), Some(AttributeValue::Ns(current))) => {
            let mut merged = current.clone();
            for item in additions {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            AttributeValue::Ns(merged)
        }
        (value @ (AttributeValue::N(_) | AttributeValue::Ss(_) | AttributeValue::Ns(_)), Some(existing)) => {
            return Err(ExpressionError::TypeMismatch {
                message: format!(
                    "ADD value of type {} does not match existing attribute of type {}",
                    value.type_descriptor(),
                    existing.type_descriptor()
                ),
            });
        }
        (other, _) => {
            return Err(ExpressionError::InvalidOperand {
                operation: "ADD".to_owned(),
                message: format!(
                    "ADD supports numbers and sets, found {}",
                    other.type_descriptor()
                ),
            });
        }
    };

    out.set_path(path, result)
        .map_err(|e| ExpressionError::Validation {
            message: e.to_string(),
        })
}

/// `DELETE path value`: set difference; an absent target is a no-op and an
/// emptied set removes the attribute.
fn apply_delete(
    out: &mut Entry,
    path: &PathOperand,
    operand: &BoundOperand,
) -> Result<(), ExpressionError> {
    let del_value = resolve(operand, out)?.ok_or_else(|| ExpressionError::InvalidOperand {
        operation: "DELETE".to_owned(),
        message: "value operand does not resolve to a value".to_owned(),
    })?;

    if !matches!(del_value, AttributeValue::Ss(_) | AttributeValue::Ns(_)) {
        return Err(ExpressionError::InvalidOperand {
            operation: "DELETE".to_owned(),
            message: format!(
                "DELETE supports string and number sets, found {}",
                del_value.type_descriptor()
            ),
        });
    }

    let Some(existing) = out.get_path(path) else {
        return Ok(());
    };

    let filtered = match (&del_value, existing) {
        (AttributeValue::Ss(remove), AttributeValue::Ss(current)) => AttributeValue::Ss(
            current
                .iter()
                .filter(|item| !remove.contains(item))
                .cloned()
                .collect(),
        ),
        (AttributeValue::Ns(remove), AttributeValue::Ns(current)) => AttributeValue::Ns(
            current
                .iter()
                .filter(|item| !remove.contains(item))
                .cloned()
                .collect(),
        ),
        (del, existing) => {
            return Err(ExpressionError::TypeMismatch {
                message: format!(
                    "DELETE value of type {} does not match existing attribute of type {}",
                    del.type_descriptor(),
                    existing.type_descriptor()
                ),
            });
        }
    };

    let emptied = match &filtered {
        AttributeValue::Ss(v) | AttributeValue::Ns(v) => v.is_empty(),
        _ => false,
    };
    if emptied {
        out.remove_path(path);
        return Ok(());
    }

    out.set_path(path, filtered)
        .map_err(|e| ExpressionError::Validation {
            message: e.to_string(),
        })
}

fn dedupe(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Numeric addition/subtraction over the string-encoded number values.
fn numeric_arithmetic(
    a: &AttributeValue,
    b: &AttributeValue,
    is_add: bool,
) -> Result<AttributeValue, ExpressionError> {
    let (AttributeValue::N(na), AttributeValue::N(nb)) = (a, b) else {
        return Err(ExpressionError::TypeMismatch {
            message: format!(
                "arithmetic requires number operands, found {} and {}",
                a.type_descriptor(),
                b.type_descriptor()
            ),
        });
    };
    let fa = parse_number(na)?;
    let fb = parse_number(nb)?;
    let result = if is_add { fa + fb } else { fa - fb };
    if !result.is_finite() {
        return Err(ExpressionError::Validation {
            message: "number overflow in arithmetic expression".to_owned(),
        });
    }
    Ok(AttributeValue::N(format_number(result)))
}

fn parse_number(s: &str) -> Result<f64, ExpressionError> {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(ExpressionError::TypeMismatch {
            message: format!("'{s}' is not a valid number"),
        }),
    }
}

/// Formats an arithmetic result: integral values print without a fraction.
#[allow(clippy::cast_possible_truncation)]
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
