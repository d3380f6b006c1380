//! AST types produced by the expression parser.
//!
//! One AST covers condition, filter, and key-condition expressions; update
//! expressions get their own clause types. Paths come out of the parser as
//! flat element lists with `#name` placeholders still embedded; binding to
//! the substitution maps happens when an AST is compiled into a closure.

use std::fmt;

/// Expression node for condition, filter, and key-condition expressions.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Comparison: `left op right`.
    Compare {
        /// Left-hand operand.
        left: Box<Operand>,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand.
        right: Box<Operand>,
    },
    /// Range test: `value BETWEEN low AND high` (inclusive).
    Between {
        /// Value under test.
        value: Box<Operand>,
        /// Lower bound.
        low: Box<Operand>,
        /// Upper bound.
        high: Box<Operand>,
    },
    /// Any-of equality: `value IN (candidates...)`.
    In {
        /// Value under test.
        value: Box<Operand>,
        /// Candidate values.
        list: Vec<Operand>,
    },
    /// `left AND right` or `left OR right`.
    Logical {
        /// The logical operator.
        op: LogicalOp,
        /// Left-hand expression.
        left: Box<Expr>,
        /// Right-hand expression.
        right: Box<Expr>,
    },
    /// Negation: `NOT expr`.
    Not(Box<Expr>),
    /// Function call: `name(args...)`.
    Function {
        /// The function.
        name: FunctionName,
        /// The arguments.
        args: Vec<Operand>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Returns `true` for the four ordering operators.
    #[must_use]
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
}

/// Built-in condition functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    /// `attribute_exists(path)`
    AttributeExists,
    /// `attribute_not_exists(path)`
    AttributeNotExists,
    /// `attribute_type(path, :type)`
    AttributeType,
    /// `begins_with(path, :prefix)`
    BeginsWith,
    /// `contains(container, needle)`
    Contains,
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AttributeExists => "attribute_exists",
            Self::AttributeNotExists => "attribute_not_exists",
            Self::AttributeType => "attribute_type",
            Self::BeginsWith => "begins_with",
            Self::Contains => "contains",
        };
        f.write_str(s)
    }
}

/// An operand: something that produces a value during evaluation.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A document path (possibly containing `#name` placeholders).
    Path(AttributePath),
    /// A `:value` reference, stored without the leading colon.
    Value(String),
    /// `size(operand)` used as an operand in a comparison.
    Size(Box<Operand>),
}

/// A document path as parsed: one or more elements, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// The path elements in order. The first element is always an attribute.
    pub elements: Vec<PathElement>,
}

/// A single parsed path element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// A named attribute; `#placeholder` references keep their `#` prefix
    /// until binding.
    Attribute(String),
    /// A list index dereference.
    Index(usize),
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elements.iter().enumerate() {
            match elem {
                PathElement::Attribute(name) if i == 0 => write!(f, "{name}")?,
                PathElement::Attribute(name) => write!(f, ".{name}")?,
                PathElement::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Update expressions
// ---------------------------------------------------------------------------

/// A parsed update expression: up to one clause of each kind.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpr {
    /// `SET path = value` actions.
    pub set_actions: Vec<SetAction>,
    /// `REMOVE path` targets.
    pub remove_paths: Vec<AttributePath>,
    /// `ADD path value` actions.
    pub add_actions: Vec<AddAction>,
    /// `DELETE path value` actions.
    pub delete_actions: Vec<DeleteAction>,
}

impl UpdateExpr {
    /// Returns `true` if no clause carries any action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set_actions.is_empty()
            && self.remove_paths.is_empty()
            && self.add_actions.is_empty()
            && self.delete_actions.is_empty()
    }
}

/// One `SET path = value` action.
#[derive(Debug, Clone)]
pub struct SetAction {
    /// The target path.
    pub path: AttributePath,
    /// The value expression assigned to it.
    pub value: SetValue,
}

/// The right-hand side of a SET action.
#[derive(Debug, Clone)]
pub enum SetValue {
    /// A plain operand.
    Operand(Operand),
    /// Numeric addition.
    Plus(Box<SetValue>, Box<SetValue>),
    /// Numeric subtraction.
    Minus(Box<SetValue>, Box<SetValue>),
    /// `if_not_exists(path, default)`.
    IfNotExists(AttributePath, Operand),
    /// `list_append(a, b)`.
    ListAppend(Operand, Operand),
}

/// One `ADD path value` action.
#[derive(Debug, Clone)]
pub struct AddAction {
    /// The target path.
    pub path: AttributePath,
    /// The number or set to add.
    pub value: Operand,
}

/// One `DELETE path value` action.
#[derive(Debug, Clone)]
pub struct DeleteAction {
    /// The target path.
    pub path: AttributePath,
    /// The set of elements to remove.
    pub value: Operand,
}
