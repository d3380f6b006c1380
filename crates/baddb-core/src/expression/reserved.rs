//! Reserved words that may not appear as bare identifiers in expressions.
//!
//! Callers must address attributes with these names through `#name`
//! placeholders. The list is matched case-insensitively and kept sorted so
//! membership is a binary search.

/// The reserved-word table, sorted ascending.
pub const RESERVED_WORDS: &[&str] = &[
    "ABORT",
    "ABSOLUTE",
    "ACTION",
    "ADD",
    "AGGREGATE",
    "ALL",
    "ALTER",
    "ANALYZE",
    "AND",
    "ANY",
    "AS",
    "ASC",
    "AVG",
    "BETWEEN",
    "BOTH",
    "BY",
    "CASCADE",
    "CASE",
    "CAST",
    "COLLATE",
    "COLUMN",
    "CONNECT",
    "CONSTRAINT",
    "COUNT",
    "CREATE",
    "CROSS",
    "CURRENT",
    "DATE",
    "DELETE",
    "DESC",
    "DISTINCT",
    "DROP",
    "ELSE",
    "END",
    "ESCAPE",
    "EXISTS",
    "EXPLAIN",
    "FALSE",
    "FETCH",
    "FOR",
    "FOREIGN",
    "FROM",
    "FULL",
    "GROUP",
    "HAVING",
    "IN",
    "INDEX",
    "INNER",
    "INSERT",
    "INTO",
    "IS",
    "JOIN",
    "LANGUAGE",
    "LEFT",
    "LIKE",
    "LIMIT",
    "LOCAL",
    "MAX",
    "MIN",
    "NATURAL",
    "NOT",
    "NULL",
    "OF",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "PRIMARY",
    "REFERENCES",
    "RELATIVE",
    "RETURN",
    "RIGHT",
    "SELECT",
    "SET",
    "SUM",
    "TABLE",
    "THEN",
    "TIME",
    "TO",
    "TRUE",
    "UNION",
    "UNIQUE",
    "UPDATE",
    "VALUES",
    "WHEN",
    "WHERE",
    "WITH",
];

/// Returns `true` if the identifier is reserved (case-insensitive).
#[must_use]
pub fn is_reserved(identifier: &str) -> bool {
    let upper = identifier.to_ascii_uppercase();
    RESERVED_WORDS.binary_search(&upper.as_str()).is_ok()
}
