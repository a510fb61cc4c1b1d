//! Error taxonomy for the structured-query core.
//!
//! Every variant except [`QueryError::Database`] is raised before a statement
//! reaches storage, so a failed call never leaves a partial write behind.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Unknown table, unknown column, or a name that is not a valid identifier.
    #[error("schema error: {0}")]
    Schema(String),

    /// Unsupported operator, malformed predicate value, or empty `values`.
    #[error("validation error: {0}")]
    Validation(String),

    /// Mutation refused by policy (update/delete without WHERE).
    #[error("policy error: {0}")]
    Policy(String),

    /// Caller payload could not be coerced into a structured descriptor.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl QueryError {
    /// Stable tag for callers that branch on the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema_error",
            Self::Validation(_) => "validation_error",
            Self::Policy(_) => "policy_error",
            Self::Parse(_) => "parse_error",
            Self::Database(_) => "database_error",
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
