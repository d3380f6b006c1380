//! Lexer and recursive-descent parser for the expression sub-language.
//!
//! One lexer feeds four sibling grammars: condition/filter/key-condition
//! expressions, update expressions, and projection expressions. Keywords are
//! matched case-insensitively; function names are case-sensitive. Bare
//! identifiers are checked against the reserved-word table and rejected with
//! a dedicated error carrying the offending keyword.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ast::{
    AddAction, AttributePath, CompareOp, DeleteAction, Expr, FunctionName, LogicalOp, Operand,
    PathElement, SetAction, SetValue, UpdateExpr,
};
use super::reserved;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while parsing, binding, or evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    /// An unexpected token was encountered.
    #[error("syntax error: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the parser expected.
        expected: String,
        /// What it found instead.
        found: String,
    },
    /// The expression ended prematurely.
    #[error("unexpected end of expression")]
    UnexpectedEof,
    /// A reserved word was used as a bare identifier.
    #[error("attribute name is a reserved keyword; reserved keyword: {keyword}")]
    ReservedKeyword {
        /// The offending keyword as written.
        keyword: String,
    },
    /// A `#name` placeholder has no entry in the attribute-name map.
    #[error("expression attribute name {name} is not defined")]
    UnresolvedName {
        /// The unresolved reference, including the `#`.
        name: String,
    },
    /// A `:value` placeholder has no entry in the attribute-value map.
    #[error("expression attribute value {name} is not defined")]
    UnresolvedValue {
        /// The unresolved reference, including the `:`.
        name: String,
    },
    /// An operand is invalid for the operation it appears in.
    #[error("invalid operand for {operation}: {message}")]
    InvalidOperand {
        /// The operation that rejected the operand.
        operation: String,
        /// Explanation.
        message: String,
    },
    /// A type mismatch during evaluation.
    #[error("type mismatch: {message}")]
    TypeMismatch {
        /// Explanation.
        message: String,
    },
    /// Any other validation failure.
    #[error("{message}")]
    Validation {
        /// Explanation.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    NamePlaceholder(String),
    ValuePlaceholder(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    And,
    Or,
    Not,
    Between,
    In,
    Set,
    Remove,
    Add,
    Delete,
    AttributeExists,
    AttributeNotExists,
    AttributeType,
    BeginsWith,
    Contains,
    Size,
    IfNotExists,
    ListAppend,
    Number(usize),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::NamePlaceholder(s) => write!(f, "#{s}"),
            Self::ValuePlaceholder(s) => write!(f, ":{s}"),
            Self::Eq => f.write_str("'='"),
            Self::Ne => f.write_str("'<>'"),
            Self::Lt => f.write_str("'<'"),
            Self::Le => f.write_str("'<='"),
            Self::Gt => f.write_str("'>'"),
            Self::Ge => f.write_str("'>='"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Dot => f.write_str("'.'"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
            Self::Between => f.write_str("BETWEEN"),
            Self::In => f.write_str("IN"),
            Self::Set => f.write_str("SET"),
            Self::Remove => f.write_str("REMOVE"),
            Self::Add => f.write_str("ADD"),
            Self::Delete => f.write_str("DELETE"),
            Self::AttributeExists => f.write_str("attribute_exists"),
            Self::AttributeNotExists => f.write_str("attribute_not_exists"),
            Self::AttributeType => f.write_str("attribute_type"),
            Self::BeginsWith => f.write_str("begins_with"),
            Self::Contains => f.write_str("contains"),
            Self::Size => f.write_str("size"),
            Self::IfNotExists => f.write_str("if_not_exists"),
            Self::ListAppend => f.write_str("list_append"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Eof => f.write_str("end of expression"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '#' => {
                self.chars.next();
                let name = self.read_placeholder_chars();
                if name.is_empty() {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "attribute name after '#'".to_owned(),
                        found: "nothing".to_owned(),
                    });
                }
                Ok(Token::NamePlaceholder(name))
            }
            ':' => {
                self.chars.next();
                let name = self.read_placeholder_chars();
                if name.is_empty() {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "value name after ':'".to_owned(),
                        found: "nothing".to_owned(),
                    });
                }
                Ok(Token::ValuePlaceholder(name))
            }
            '=' => {
                self.chars.next();
                Ok(Token::Eq)
            }
            '<' => {
                self.chars.next();
                match self.chars.peek() {
                    Some('=') => {
                        self.chars.next();
                        Ok(Token::Le)
                    }
                    Some('>') => {
                        self.chars.next();
                        Ok(Token::Ne)
                    }
                    _ => Ok(Token::Lt),
                }
            }
            '>' => {
                self.chars.next();
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }
            '+' => {
                self.chars.next();
                Ok(Token::Plus)
            }
            '-' => {
                self.chars.next();
                Ok(Token::Minus)
            }
            '.' => {
                self.chars.next();
                Ok(Token::Dot)
            }
            ',' => {
                self.chars.next();
                Ok(Token::Comma)
            }
            '(' => {
                self.chars.next();
                Ok(Token::LParen)
            }
            ')' => {
                self.chars.next();
                Ok(Token::RParen)
            }
            '[' => {
                self.chars.next();
                Ok(Token::LBracket)
            }
            ']' => {
                self.chars.next();
                Ok(Token::RBracket)
            }
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() => self.read_word(),
            other => Err(ExpressionError::UnexpectedToken {
                expected: "a valid token".to_owned(),
                found: format!("'{other}'"),
            }),
        }
    }

    /// Characters after `#` or `:`; unlike bare identifiers these may start
    /// with a digit or underscore.
    fn read_placeholder_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_number(&mut self) -> Result<Token, ExpressionError> {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let n: usize = s.parse().map_err(|_| ExpressionError::Validation {
            message: format!("list index is not within the allowable range; index: [{s}]"),
        })?;
        Ok(Token::Number(n))
    }

    fn read_word(&mut self) -> Result<Token, ExpressionError> {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        // Grammar keywords, case-insensitive.
        match word.to_ascii_lowercase().as_str() {
            "and" => return Ok(Token::And),
            "or" => return Ok(Token::Or),
            "not" => return Ok(Token::Not),
            "between" => return Ok(Token::Between),
            "in" => return Ok(Token::In),
            "set" => return Ok(Token::Set),
            "remove" => return Ok(Token::Remove),
            "add" => return Ok(Token::Add),
            "delete" => return Ok(Token::Delete),
            _ => {}
        }

        // Function names, case-sensitive.
        match word.as_str() {
            "attribute_exists" => return Ok(Token::AttributeExists),
            "attribute_not_exists" => return Ok(Token::AttributeNotExists),
            "attribute_type" => return Ok(Token::AttributeType),
            "begins_with" => return Ok(Token::BeginsWith),
            "contains" => return Ok(Token::Contains),
            "size" => return Ok(Token::Size),
            "if_not_exists" => return Ok(Token::IfNotExists),
            "list_append" => return Ok(Token::ListAppend),
            _ => {}
        }

        if reserved::is_reserved(&word) {
            return Err(ExpressionError::ReservedKeyword { keyword: word });
        }

        Ok(Token::Identifier(word))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        let tok = self.advance();
        if std::mem::discriminant(&tok) == std::mem::discriminant(expected) {
            Ok(())
        } else {
            Err(ExpressionError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.to_string(),
            })
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn ensure_done(&self) -> Result<(), ExpressionError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(ExpressionError::UnexpectedToken {
                expected: "end of expression".to_owned(),
                found: self.peek().to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Condition grammar (precedence: NOT > AND > OR)
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Token::LParen) {
            self.advance();
            let expr = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(expr);
        }

        // Update-only functions are not valid conditions.
        if matches!(self.peek(), Token::IfNotExists | Token::ListAppend) {
            let name = self.advance().to_string();
            return Err(ExpressionError::InvalidOperand {
                operation: name.clone(),
                message: format!("the function {name} is not allowed in a condition expression"),
            });
        }

        if let Some(name) = self.peek_condition_function() {
            return self.parse_function(name);
        }

        let operand = self.parse_operand()?;
        self.parse_comparison_tail(operand)
    }

    fn peek_condition_function(&self) -> Option<FunctionName> {
        match self.peek() {
            Token::AttributeExists => Some(FunctionName::AttributeExists),
            Token::AttributeNotExists => Some(FunctionName::AttributeNotExists),
            Token::AttributeType => Some(FunctionName::AttributeType),
            Token::BeginsWith => Some(FunctionName::BeginsWith),
            Token::Contains => Some(FunctionName::Contains),
            _ => None,
        }
    }

    fn parse_function(&mut self, name: FunctionName) -> Result<Expr, ExpressionError> {
        self.advance();
        self.expect(&Token::LParen)?;
        let mut args = vec![self.parse_operand()?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            args.push(self.parse_operand()?);
        }
        self.expect(&Token::RParen)?;
        Ok(Expr::Function { name, args })
    }

    fn parse_comparison_tail(&mut self, left: Operand) -> Result<Expr, ExpressionError> {
        match self.peek() {
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                let op = match self.advance() {
                    Token::Eq => CompareOp::Eq,
                    Token::Ne => CompareOp::Ne,
                    Token::Lt => CompareOp::Lt,
                    Token::Le => CompareOp::Le,
                    Token::Gt => CompareOp::Gt,
                    _ => CompareOp::Ge,
                };
                let right = self.parse_operand()?;
                Ok(Expr::Compare {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                })
            }
            Token::Between => {
                self.advance();
                let low = self.parse_operand()?;
                self.expect(&Token::And)?;
                let high = self.parse_operand()?;
                Ok(Expr::Between {
                    value: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                })
            }
            Token::In => {
                self.advance();
                self.expect(&Token::LParen)?;
                if matches!(self.peek(), Token::RParen) {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "at least one operand in the IN list".to_owned(),
                        found: "')'".to_owned(),
                    });
                }
                let mut list = vec![self.parse_operand()?];
                while matches!(self.peek(), Token::Comma) {
                    self.advance();
                    list.push(self.parse_operand()?);
                }
                self.expect(&Token::RParen)?;
                Ok(Expr::In {
                    value: Box::new(left),
                    list,
                })
            }
            Token::LParen => {
                // `something(...)` where `something` is not a known function.
                let func = match &left {
                    Operand::Path(path) => path.to_string(),
                    other => format!("{other:?}"),
                };
                Err(ExpressionError::UnexpectedToken {
                    expected: "a valid function name".to_owned(),
                    found: format!("'{func}' is not a recognized function"),
                })
            }
            other => Err(ExpressionError::UnexpectedToken {
                expected: "comparison operator, BETWEEN, or IN".to_owned(),
                found: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Operands and paths
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_operand(&mut self) -> Result<Operand, ExpressionError> {
        match self.peek() {
            Token::ValuePlaceholder(_) => {
                let Token::ValuePlaceholder(name) = self.advance() else {
                    return Err(ExpressionError::UnexpectedEof);
                };
                Ok(Operand::Value(name))
            }
            Token::Size => {
                self.advance();
                self.expect(&Token::LParen)?;
                let inner = self.parse_operand()?;
                self.expect(&Token::RParen)?;
                Ok(Operand::Size(Box::new(inner)))
            }
            _ => Ok(Operand::Path(self.parse_path()?)),
        }
    }

    fn parse_path(&mut self) -> Result<AttributePath, ExpressionError> {
        let mut elements = vec![self.parse_path_head()?];

        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    elements.push(self.parse_path_head()?);
                }
                Token::LBracket => {
                    self.advance();
                    let tok = self.advance();
                    if matches!(tok, Token::Minus) {
                        return Err(ExpressionError::Validation {
                            message: "negative list index is not allowed".to_owned(),
                        });
                    }
                    let Token::Number(idx) = tok else {
                        return Err(ExpressionError::UnexpectedToken {
                            expected: "a non-negative integer index".to_owned(),
                            found: tok.to_string(),
                        });
                    };
                    self.expect(&Token::RBracket)?;
                    elements.push(PathElement::Index(idx));
                }
                _ => break,
            }
        }

        Ok(AttributePath { elements })
    }

    fn parse_path_head(&mut self) -> Result<PathElement, ExpressionError> {
        match self.advance() {
            Token::Identifier(name) => Ok(PathElement::Attribute(name)),
            Token::NamePlaceholder(name) => Ok(PathElement::Attribute(format!("#{name}"))),
            other => Err(ExpressionError::UnexpectedToken {
                expected: "attribute name or #name".to_owned(),
                found: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Update grammar
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_update(&mut self) -> Result<UpdateExpr, ExpressionError> {
        let mut update = UpdateExpr::default();
        let mut seen: [bool; 4] = [false; 4];

        while !self.at_end() {
            match self.peek() {
                Token::Set => {
                    self.take_clause(&mut seen[0], "SET")?;
                    update.set_actions.push(self.parse_set_action()?);
                    while matches!(self.peek(), Token::Comma) {
                        self.advance();
                        update.set_actions.push(self.parse_set_action()?);
                    }
                }
                Token::Remove => {
                    self.take_clause(&mut seen[1], "REMOVE")?;
                    update.remove_paths.push(self.parse_path()?);
                    while matches!(self.peek(), Token::Comma) {
                        self.advance();
                        update.remove_paths.push(self.parse_path()?);
                    }
                }
                Token::Add => {
                    self.take_clause(&mut seen[2], "ADD")?;
                    update.add_actions.push(self.parse_add_action()?);
                    while matches!(self.peek(), Token::Comma) {
                        self.advance();
                        update.add_actions.push(self.parse_add_action()?);
                    }
                }
                Token::Delete => {
                    self.take_clause(&mut seen[3], "DELETE")?;
                    update.delete_actions.push(self.parse_delete_action()?);
                    while matches!(self.peek(), Token::Comma) {
                        self.advance();
                        update.delete_actions.push(self.parse_delete_action()?);
                    }
                }
                other => {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "SET, REMOVE, ADD, or DELETE".to_owned(),
                        found: other.to_string(),
                    });
                }
            }
        }

        Ok(update)
    }

    /// Consumes a clause keyword, rejecting a repeated clause kind.
    fn take_clause(&mut self, seen: &mut bool, clause: &str) -> Result<(), ExpressionError> {
        if *seen {
            return Err(ExpressionError::Validation {
                message: format!(
                    "the {clause} section can only be used once in an update expression"
                ),
            });
        }
        *seen = true;
        self.advance();
        Ok(())
    }

    fn parse_set_action(&mut self) -> Result<SetAction, ExpressionError> {
        let path = self.parse_path()?;
        self.expect(&Token::Eq)?;
        let value = self.parse_set_value()?;
        Ok(SetAction { path, value })
    }

    /// Parses a SET value, including trailing `+`/`-` arithmetic like
    /// `if_not_exists(views, :zero) + :one`.
    fn parse_set_value(&mut self) -> Result<SetValue, ExpressionError> {
        let first = self.parse_set_value_primary()?;
        match self.peek() {
            Token::Plus => {
                self.advance();
                let right = self.parse_set_value_primary()?;
                Ok(SetValue::Plus(Box::new(first), Box::new(right)))
            }
            Token::Minus => {
                self.advance();
                let right = self.parse_set_value_primary()?;
                Ok(SetValue::Minus(Box::new(first), Box::new(right)))
            }
            _ => Ok(first),
        }
    }

    fn parse_set_value_primary(&mut self) -> Result<SetValue, ExpressionError> {
        match self.peek() {
            Token::IfNotExists => {
                self.advance();
                self.expect(&Token::LParen)?;
                let path = self.parse_path()?;
                self.expect(&Token::Comma)?;
                let default = self.parse_operand()?;
                self.expect(&Token::RParen)?;
                Ok(SetValue::IfNotExists(path, default))
            }
            Token::ListAppend => {
                self.advance();
                self.expect(&Token::LParen)?;
                let first = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let second = self.parse_operand()?;
                self.expect(&Token::RParen)?;
                Ok(SetValue::ListAppend(first, second))
            }
            _ => Ok(SetValue::Operand(self.parse_operand()?)),
        }
    }

    fn parse_add_action(&mut self) -> Result<AddAction, ExpressionError> {
        let path = self.parse_path()?;
        let value = self.parse_operand()?;
        Ok(AddAction { path, value })
    }

    fn parse_delete_action(&mut self) -> Result<DeleteAction, ExpressionError> {
        let path = self.parse_path()?;
        let value = self.parse_operand()?;
        Ok(DeleteAction { path, value })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parses a condition, filter, or key-condition expression.
///
/// # Errors
///
/// Returns `ExpressionError` if the expression is syntactically invalid or
/// uses a reserved word as a bare identifier.
pub fn parse_condition(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_or()?;
    parser.ensure_done()?;
    Ok(expr)
}

/// Parses an update expression (SET / REMOVE / ADD / DELETE).
///
/// # Errors
///
/// Returns `ExpressionError` if the expression is syntactically invalid,
/// empty, or repeats a clause kind.
pub fn parse_update(input: &str) -> Result<UpdateExpr, ExpressionError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let update = parser.parse_update()?;
    if update.is_empty() {
        return Err(ExpressionError::Validation {
            message: "an update expression requires at least one clause".to_owned(),
        });
    }
    Ok(update)
}

/// Parses a projection expression: comma-separated attribute paths.
///
/// # Errors
///
/// Returns `ExpressionError` if the expression is empty, syntactically
/// invalid, or contains overlapping or conflicting document paths.
pub fn parse_projection(input: &str) -> Result<Vec<AttributePath>, ExpressionError> {
    if input.trim().is_empty() {
        return Err(ExpressionError::Validation {
            message: "a projection expression can not be empty".to_owned(),
        });
    }

    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    let mut paths = vec![parser.parse_path()?];
    while matches!(parser.peek(), Token::Comma) {
        parser.advance();
        paths.push(parser.parse_path()?);
    }
    parser.ensure_done()?;

    validate_projection_paths(&paths)?;
    Ok(paths)
}

/// Rejects projection paths that overlap (one a prefix of another, or two
/// identical) or conflict (the same node addressed both as a map field and
/// as a list element).
fn validate_projection_paths(paths: &[AttributePath]) -> Result<(), ExpressionError> {
    for i in 0..paths.len() {
        for j in (i + 1)..paths.len() {
            let a = &paths[i].elements;
            let b = &paths[j].elements;
            let mut shared_prefix = true;

            for k in 0..a.len().min(b.len()) {
                match (&a[k], &b[k]) {
                    (PathElement::Attribute(x), PathElement::Attribute(y)) if x == y => {}
                    (PathElement::Index(x), PathElement::Index(y)) if x == y => {}
                    (PathElement::Attribute(_), PathElement::Attribute(_))
                    | (PathElement::Index(_), PathElement::Index(_)) => {
                        shared_prefix = false;
                        break;
                    }
                    _ => {
                        return Err(ExpressionError::Validation {
                            message: format!(
                                "two document paths conflict with each other; path one: \
                                 [{}], path two: [{}]",
                                paths[i], paths[j]
                            ),
                        });
                    }
                }
            }

            if shared_prefix {
                return Err(ExpressionError::Validation {
                    message: format!(
                        "two document paths overlap with each other; path one: [{}], \
                         path two: [{}]",
                        paths[i], paths[j]
                    ),
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
