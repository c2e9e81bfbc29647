//! Error types for the query layer.
//!
//! Errors are layered: [`QueryError`] is what every public operation returns,
//! and it wraps the narrower categories for driver failures, transaction
//! failures, concurrency conflicts and row materialization.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all query operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Errors raised by the driver adapter.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Transaction lifecycle errors.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Concurrency conflicts detected by update operations.
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Errors converting rows into objects.
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// The caller supplied input this layer cannot execute.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Reading a script or other input from disk failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Creates an input error with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        QueryError::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns true if this is a concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, QueryError::Concurrency(_))
    }
}

/// Errors originating from the driver adapter.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Acquiring a connection failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// A statement failed to execute.
    #[error("query failed on {backend_name}: {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// BEGIN failed.
    #[error("failed to begin transaction: {reason}")]
    BeginFailed { reason: String },

    /// COMMIT failed.
    #[error("failed to commit transaction: {reason}")]
    CommitFailed { reason: String },

    /// ROLLBACK failed.
    #[error("failed to roll back transaction: {reason}")]
    RollbackFailed { reason: String },

    /// Releasing the connection failed.
    #[error("failed to release connection: {reason}")]
    ReleaseFailed { reason: String },
}

/// Errors raised when an optimistic update finds the row changed underneath it.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The update touched a different number of rows than expected.
    #[error("concurrent modification of {entity}: expected {expected} row(s), updated {actual}")]
    Conflict {
        entity: String,
        expected: u64,
        actual: u64,
    },
}

impl ConcurrencyError {
    /// Checks an update's affected-row count against the expected count.
    pub fn check(entity: impl Into<String>, expected: u64, actual: u64) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(ConcurrencyError::Conflict {
                entity: entity.into(),
                expected,
                actual,
            })
        }
    }
}

/// Errors raised while turning rows into nested objects.
#[derive(Error, Debug)]
pub enum MaterializeError {
    /// An attribute path walks through a value that is not an object.
    #[error("cannot assign '{path}': '{segment}' is already a non-object value")]
    PathConflict { path: String, segment: String },

    /// The row shape does not match the result set fields.
    #[error("row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The object could not be deserialized into the target type.
    #[error("failed to deserialize row {row}: {message}")]
    Deserialize { row: usize, message: String },
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::Backend(BackendError::QueryFailed {
            backend_name: "sqlite".to_string(),
            message: "no such table: users".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "query failed on sqlite: no such table: users"
        );
    }

    #[test]
    fn test_error_conversion() {
        let tx_err = TransactionError::CommitFailed {
            reason: "connection reset".to_string(),
        };
        let err: QueryError = tx_err.into();
        assert!(matches!(err, QueryError::Transaction(_)));
    }

    #[test]
    fn test_concurrency_check() {
        assert!(ConcurrencyError::check("account/7", 1, 1).is_ok());

        let err: QueryError = ConcurrencyError::check("account/7", 1, 0).unwrap_err().into();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("account/7"));
    }

    #[test]
    fn test_invalid_input() {
        let err = QueryError::invalid_input("page size must be positive");
        assert_eq!(err.to_string(), "invalid input: page size must be positive");
    }
}
