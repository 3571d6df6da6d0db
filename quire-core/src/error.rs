/// Structured error types for quire-core.
///
/// Uses `thiserror` so the server crate can map each failure kind onto a
/// response. Binary crates (quire-cli) still use `anyhow` at the edges.
use std::fmt;
use thiserror::Error;

/// Transaction step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOp {
    Begin,
    Commit,
    Rollback,
}

impl fmt::Display for TxOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        };
        f.write_str(op)
    }
}

/// Main error type for scope, transaction and store operations
#[derive(Error, Debug)]
pub enum DbError {
    /// Store unreachable or misconfigured
    #[error("connection error: {source}")]
    Connection {
        #[source]
        source: sqlx::Error,
    },

    /// BEGIN, COMMIT or ROLLBACK failed
    #[error("transaction {op} failed: {source}")]
    Transaction {
        op: TxOp,
        #[source]
        source: sqlx::Error,
    },

    /// Programming defect, e.g. a unit of work opened inside another
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// Unique constraint violated
    #[error("conflict on {resource}: {detail}")]
    Conflict {
        resource: &'static str,
        detail: String,
    },

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// Any other query failure
    #[error("database error: {0}")]
    Query(sqlx::Error),
}

/// Result type alias for quire-core operations
pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn connection(source: sqlx::Error) -> Self {
        Self::Connection { source }
    }

    pub fn transaction(op: TxOp, source: sqlx::Error) -> Self {
        Self::Transaction { op, source }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a query error, turning unique violations into [`DbError::Conflict`].
    pub fn from_query(resource: &'static str, err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => Self::Conflict {
                resource,
                detail: db
                    .constraint()
                    .map(str::to_owned)
                    .unwrap_or_else(|| db.message().to_owned()),
            },
            _ => Self::Query(err),
        }
    }

    /// True for failures that should surface as a 5xx
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Conflict { .. } | Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_query("row", err)
    }
}
