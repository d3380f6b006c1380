//! Compiles condition ASTs into predicate closures over an entry.
//!
//! A [`ConditionExpression`] is parsed and bound once, then evaluated any
//! number of times. The compiled closure captures the resolved substitution
//! maps, so evaluation touches only the entry.

use std::collections::HashMap;
use std::fmt;

use baddb_model::{AttributeValue, Entry};

use super::ast::{CompareOp, Expr, FunctionName, Operand};
use super::eval::{BoundOperand, bind_operand, bind_path_operand, compare_values, resolve};
use super::parser::{ExpressionError, parse_condition};

type Predicate = Box<dyn Fn(&Entry) -> Result<bool, ExpressionError> + Send + Sync>;

/// A compiled condition (or filter) expression.
pub struct ConditionExpression {
    text: String,
    predicate: Predicate,
}

impl ConditionExpression {
    /// Parses, binds, and compiles a condition expression.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` on a syntax error, a reserved word used as
    /// an identifier, or an unresolvable `#name`/`:value` placeholder.
    pub fn new(
        text: &str,
        names: &HashMap<String, String>,
        values: &HashMap<String, AttributeValue>,
    ) -> Result<Self, ExpressionError> {
        let expr = parse_condition(text)?;
        let predicate = compile(&expr, names, values)?;
        Ok(Self {
            text: text.to_owned(),
            predicate,
        })
    }

    /// Evaluates the condition against an entry.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::TypeMismatch` when the entry's data is
    /// incompatible with the condition (e.g. ordering a list).
    pub fn evaluate(&self, entry: &Entry) -> Result<bool, ExpressionError> {
        (self.predicate)(entry)
    }

    /// The original expression text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Debug for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionExpression")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// Recursively compiles an expression node into a closure.
fn compile(
    expr: &Expr,
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<Predicate, ExpressionError> {
    match expr {
        Expr::Compare { left, op, right } => {
            let left = bind_operand(left, names, values)?;
            let right = bind_operand(right, names, values)?;
            let op = *op;
            Ok(Box::new(move |entry| {
                let (Some(lv), Some(rv)) = (resolve(&left, entry)?, resolve(&right, entry)?)
                else {
                    return Ok(false);
                };
                compare_values(&lv, &rv, op)
            }))
        }
        Expr::Between { value, low, high } => {
            let value = bind_operand(value, names, values)?;
            let low = bind_operand(low, names, values)?;
            let high = bind_operand(high, names, values)?;
            Ok(Box::new(move |entry| {
                let (Some(v), Some(lo), Some(hi)) = (
                    resolve(&value, entry)?,
                    resolve(&low, entry)?,
                    resolve(&high, entry)?,
                ) else {
                    return Ok(false);
                };
                Ok(compare_values(&v, &lo, CompareOp::Ge)?
                    && compare_values(&v, &hi, CompareOp::Le)?)
            }))
        }
        Expr::In { value, list } => {
            let value = bind_operand(value, names, values)?;
            let list = list
                .iter()
                .map(|op| bind_operand(op, names, values))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(move |entry| {
                let Some(v) = resolve(&value, entry)? else {
                    return Ok(false);
                };
                for candidate in &list {
                    if let Some(cv) = resolve(candidate, entry)? {
                        if v.equal(&cv) {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }))
        }
        Expr::Logical { op, left, right } => {
            let left = compile(left, names, values)?;
            let right = compile(right, names, values)?;
            let and = matches!(op, super::ast::LogicalOp::And);
            Ok(Box::new(move |entry| {
                if and {
                    Ok(left(entry)? && right(entry)?)
                } else {
                    Ok(left(entry)? || right(entry)?)
                }
            }))
        }
        Expr::Not(inner) => {
            let inner = compile(inner, names, values)?;
            Ok(Box::new(move |entry| inner(entry).map(|v| !v)))
        }
        Expr::Function { name, args } => compile_function(*name, args, names, values),
    }
}

/// Compiles a condition function call.
fn compile_function(
    name: FunctionName,
    args: &[Operand],
    names: &HashMap<String, String>,
    values: &HashMap<String, AttributeValue>,
) -> Result<Predicate, ExpressionError> {
    expect_arg_count(name, args)?;

    match name {
        FunctionName::AttributeExists => {
            let path = bind_path_operand(&args[0], names, "attribute_exists")?;
            Ok(Box::new(move |entry| Ok(entry.get_path(&path).is_some())))
        }
        FunctionName::AttributeNotExists => {
            let path = bind_path_operand(&args[0], names, "attribute_not_exists")?;
            Ok(Box::new(move |entry| Ok(entry.get_path(&path).is_none())))
        }
        FunctionName::AttributeType => {
            let target = bind_operand(&args[0], names, values)?;
            // The type argument must be a value reference resolving to a
            // valid type descriptor string; checked once at compile time.
            let BoundOperand::Value(AttributeValue::S(expected)) =
                bind_operand(&args[1], names, values)?
            else {
                return Err(ExpressionError::InvalidOperand {
                    operation: "attribute_type".to_owned(),
                    message: "the type argument must be a string value reference".to_owned(),
                });
            };
            if !matches!(
                expected.as_str(),
                "B" | "BOOL" | "L" | "M" | "N" | "NS" | "NULL" | "S" | "SS"
            ) {
                return Err(ExpressionError::InvalidOperand {
                    operation: "attribute_type".to_owned(),
                    message: format!("'{expected}' is not a valid attribute type"),
                });
            }
            Ok(Box::new(move |entry| {
                Ok(resolve(&target, entry)?
                    .is_some_and(|v| v.type_descriptor() == expected))
            }))
        }
        FunctionName::BeginsWith => {
            let target = bind_operand(&args[0], names, values)?;
            let prefix = bind_operand(&args[1], names, values)?;
            Ok(Box::new(move |entry| {
                let Some(tv) = resolve(&target, entry)? else {
                    return Ok(false);
                };
                let Some(pv) = resolve(&prefix, entry)? else {
                    return Ok(false);
                };
                match (&tv, &pv) {
                    (AttributeValue::S(s), AttributeValue::S(p)) => Ok(s.starts_with(p.as_str())),
                    _ => Err(ExpressionError::TypeMismatch {
                        message: format!(
                            "begins_with requires string operands, found {} and {}",
                            tv.type_descriptor(),
                            pv.type_descriptor()
                        ),
                    }),
                }
            }))
        }
        FunctionName::Contains => {
            let container = bind_operand(&args[0], names, values)?;
            let needle = bind_operand(&args[1], names, values)?;
            Ok(Box::new(move |entry| {
                let (Some(cv), Some(nv)) = (resolve(&container, entry)?, resolve(&needle, entry)?)
                else {
                    return Ok(false);
                };
                Ok(contains(&cv, &nv))
            }))
        }
    }
}

/// Membership semantics for `contains`: substring for strings, element
/// membership for sets, and member equality (on `S` or `N` members) for
/// lists.
fn contains(container: &AttributeValue, needle: &AttributeValue) -> bool {
    match (container, needle) {
        (AttributeValue::S(s), AttributeValue::S(sub)) => s.contains(sub.as_str()),
        (AttributeValue::Ss(set), AttributeValue::S(v))
        | (AttributeValue::Ns(set), AttributeValue::N(v)) => set.contains(v),
        (AttributeValue::L(list), _) => list.iter().any(|member| {
            matches!(member, AttributeValue::S(_) | AttributeValue::N(_)) && member.equal(needle)
        }),
        _ => false,
    }
}

fn expect_arg_count(name: FunctionName, args: &[Operand]) -> Result<(), ExpressionError> {
    let expected = match name {
        FunctionName::AttributeExists | FunctionName::AttributeNotExists => 1,
        FunctionName::AttributeType | FunctionName::BeginsWith | FunctionName::Contains => 2,
    };
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExpressionError::InvalidOperand {
            operation: name.to_string(),
            message: format!(
                "incorrect number of operands; expected {expected}, found {}",
                args.len()
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
