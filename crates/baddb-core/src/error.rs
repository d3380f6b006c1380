//! The typed error taxonomy surfaced to the front end.
//!
//! Every kind is a distinct variant, so callers discriminate without string
//! matching. Expression parse failures are wrapped with the expression kind
//! they came from; a reserved-word failure keeps its own variant because it
//! carries the offending keyword.

use baddb_model::CompareError;

use crate::expression::ExpressionError;

/// Result alias for engine operations.
pub type BaddbResult<T> = Result<T, BaddbError>;

/// Errors produced by the storage engine and request builders.
#[derive(Debug, thiserror::Error)]
pub enum BaddbError {
    /// Malformed input: bad schema, missing key, type mismatch, invalid
    /// number, and similar.
    #[error("ValidationException: {message}")]
    Validation {
        /// Explanation.
        message: String,
    },

    /// A reserved word appeared as a bare identifier in an expression.
    #[error("ValidationException: attribute name is a reserved keyword; reserved keyword: {keyword}")]
    ReservedKeyword {
        /// The offending keyword as written.
        keyword: String,
    },

    /// Unknown table or index.
    #[error("ResourceNotFoundException: {message}")]
    ResourceNotFound {
        /// Explanation.
        message: String,
    },

    /// Duplicate table creation.
    #[error("ResourceInUseException: {message}")]
    ResourceInUse {
        /// Explanation.
        message: String,
    },

    /// A condition expression evaluated to false.
    #[error("ConditionalCheckFailedException: the conditional request failed")]
    ConditionalCheckFailed,

    /// Admission rejected by the rate limiter.
    #[error("ProvisionedThroughputExceededException: {message}")]
    ProvisionedThroughputExceeded {
        /// Explanation.
        message: String,
    },

    /// Admission rejected by the chaos counter.
    #[error("the request was not processed")]
    Unprocessed,

    /// A condition expression failed to parse or bind.
    #[error("invalid ConditionExpression: {source}")]
    InvalidConditionExpression {
        /// The underlying parser error.
        #[source]
        source: ExpressionError,
    },

    /// A filter expression failed to parse or bind.
    #[error("invalid FilterExpression: {source}")]
    InvalidFilterExpression {
        /// The underlying parser error.
        #[source]
        source: ExpressionError,
    },

    /// An update expression failed to parse or bind.
    #[error("invalid UpdateExpression: {source}")]
    InvalidUpdateExpression {
        /// The underlying parser error.
        #[source]
        source: ExpressionError,
    },

    /// Invariant violation inside the engine. Never swallowed.
    #[error("InternalError: {message}")]
    Internal {
        /// Explanation.
        message: String,
    },
}

impl BaddbError {
    /// Validation error with a message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Unknown table.
    #[must_use]
    pub fn table_not_found(name: &str) -> Self {
        Self::ResourceNotFound {
            message: format!("table not found: {name}"),
        }
    }

    /// Unknown index on a known table.
    #[must_use]
    pub fn index_not_found(table: &str, index: &str) -> Self {
        Self::ResourceNotFound {
            message: format!("index not found: {index} on table {table}"),
        }
    }

    /// Duplicate table creation.
    #[must_use]
    pub fn table_exists(name: &str) -> Self {
        Self::ResourceInUse {
            message: format!("table already exists: {name}"),
        }
    }

    /// Rate limiter refused admission for the named table or index.
    #[must_use]
    pub fn throughput_exceeded(target: &str) -> Self {
        Self::ProvisionedThroughputExceeded {
            message: format!("rate limit reached for {target}"),
        }
    }

    /// Internal invariant violation.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wraps a condition-expression failure, preserving reserved-word
    /// errors as their own kind.
    #[must_use]
    pub fn condition_expression(source: ExpressionError) -> Self {
        match source {
            ExpressionError::ReservedKeyword { keyword } => Self::ReservedKeyword { keyword },
            source => Self::InvalidConditionExpression { source },
        }
    }

    /// Wraps a filter-expression failure.
    #[must_use]
    pub fn filter_expression(source: ExpressionError) -> Self {
        match source {
            ExpressionError::ReservedKeyword { keyword } => Self::ReservedKeyword { keyword },
            source => Self::InvalidFilterExpression { source },
        }
    }

    /// Wraps an update-expression failure.
    #[must_use]
    pub fn update_expression(source: ExpressionError) -> Self {
        match source {
            ExpressionError::ReservedKeyword { keyword } => Self::ReservedKeyword { keyword },
            source => Self::InvalidUpdateExpression { source },
        }
    }

    /// Maps an expression failure that happened while evaluating (not
    /// parsing) into a validation error.
    #[must_use]
    pub fn evaluation(source: &ExpressionError) -> Self {
        Self::Validation {
            message: source.to_string(),
        }
    }
}

impl From<CompareError> for BaddbError {
    fn from(e: CompareError) -> Self {
        Self::Validation {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_preserve_reserved_keyword_through_wrapping() {
        let err = BaddbError::condition_expression(ExpressionError::ReservedKeyword {
            keyword: "language".to_owned(),
        });
        assert!(matches!(err, BaddbError::ReservedKeyword { ref keyword } if keyword == "language"));
    }

    #[test]
    fn test_should_wrap_parser_errors_with_expression_kind() {
        let parse_err = ExpressionError::UnexpectedEof;
        let err = BaddbError::update_expression(parse_err.clone());
        assert!(matches!(
            err,
            BaddbError::InvalidUpdateExpression { source } if source == parse_err
        ));
    }

    #[test]
    fn test_should_render_service_style_messages() {
        let err = BaddbError::table_not_found("movies");
        assert!(err.to_string().starts_with("ResourceNotFoundException"));
    }
}
