//! Scoped connection and transaction handling.
//!
//! [`TransactionCoordinator`] checks a connection out of a driver, runs
//! caller-supplied work with it, and hands it back. Every invocation acquires
//! exactly once and releases exactly once, whatever the work, the commit or
//! the rollback does.
//!
//! ```ignore
//! let coordinator = TransactionCoordinator::new(driver.clone());
//!
//! let moved = coordinator
//!     .transactional(async |conn| {
//!         conn.execute("UPDATE accounts SET balance = balance - 10 WHERE id = $1", &[1.into()])
//!             .await?;
//!         conn.execute("UPDATE accounts SET balance = balance + 10 WHERE id = $1", &[2.into()])
//!             .await
//!     })
//!     .await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::driver::{Connection, Driver};
use crate::error::QueryResult;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read committed - sees only committed data.
    #[default]
    ReadCommitted,
    /// Repeatable read - consistent reads within transaction.
    RepeatableRead,
    /// Serializable - full isolation (may reduce concurrency).
    Serializable,
}

impl IsolationLevel {
    /// The SQL spelling of the level.
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IsolationLevel::ReadCommitted => write!(f, "read-committed"),
            IsolationLevel::RepeatableRead => write!(f, "repeatable-read"),
            IsolationLevel::Serializable => write!(f, "serializable"),
        }
    }
}

/// Options for starting a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// The isolation level for the transaction.
    pub isolation_level: IsolationLevel,
    /// Whether this is a read-only transaction.
    pub read_only: bool,
}

impl TransactionOptions {
    /// Creates new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the isolation level.
    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    /// Marks this as a read-only transaction.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Returns true if these are the driver defaults.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// The `SET TRANSACTION` statement for non-default options.
    pub fn set_transaction_statement(&self) -> Option<String> {
        if self.is_default() {
            return None;
        }
        let mut statement = format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation_level.as_sql()
        );
        if self.read_only {
            statement.push_str(" READ ONLY");
        }
        Some(statement)
    }
}

/// Runs work against a connection with guaranteed release.
#[derive(Debug)]
pub struct TransactionCoordinator<D> {
    driver: Arc<D>,
}

impl<D> Clone for TransactionCoordinator<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<D: Driver> TransactionCoordinator<D> {
    /// Creates a coordinator over a driver.
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }

    /// The driver connections come from.
    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Runs `work` inside a transaction with default options.
    pub async fn transactional<T, F>(&self, work: F) -> QueryResult<T>
    where
        F: AsyncFnOnce(&mut D::Connection) -> QueryResult<T>,
    {
        self.transactional_with(&TransactionOptions::default(), work)
            .await
    }

    /// Runs `work` inside a transaction.
    ///
    /// On success the transaction is committed and the work's value returned.
    /// If the work fails the transaction is rolled back and the work's error
    /// is returned unchanged; a failing rollback is logged, not returned. The
    /// connection is released last in every case.
    pub async fn transactional_with<T, F>(
        &self,
        options: &TransactionOptions,
        work: F,
    ) -> QueryResult<T>
    where
        F: AsyncFnOnce(&mut D::Connection) -> QueryResult<T>,
    {
        let mut conn = self.driver.acquire().await?;
        let outcome = run_in_transaction(&mut conn, options, work).await;
        self.finish(conn, outcome).await
    }

    /// Runs `work` with a connection and no transaction.
    pub async fn with_connection<T, F>(&self, work: F) -> QueryResult<T>
    where
        F: AsyncFnOnce(&mut D::Connection) -> QueryResult<T>,
    {
        let mut conn = self.driver.acquire().await?;
        let outcome = work(&mut conn).await;
        self.finish(conn, outcome).await
    }

    async fn finish<T>(&self, conn: D::Connection, outcome: QueryResult<T>) -> QueryResult<T> {
        let released = conn.release().await;
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                error!(
                    backend = self.driver.name(),
                    error = %release_err,
                    "Failed to release connection after error"
                );
                Err(err)
            }
        }
    }
}

async fn run_in_transaction<C, T, F>(
    conn: &mut C,
    options: &TransactionOptions,
    work: F,
) -> QueryResult<T>
where
    C: Connection,
    F: AsyncFnOnce(&mut C) -> QueryResult<T>,
{
    conn.begin_with(options).await?;
    debug!(isolation = %options.isolation_level, read_only = options.read_only, "Transaction started");

    match work(&mut *conn).await {
        Ok(value) => {
            conn.commit().await?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "Rolling back transaction");
            if let Err(rollback_err) = conn.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_sql() {
        assert_eq!(IsolationLevel::ReadCommitted.as_sql(), "READ COMMITTED");
        assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
        assert_eq!(IsolationLevel::RepeatableRead.to_string(), "repeatable-read");
    }

    #[test]
    fn test_default_options_issue_no_statement() {
        assert!(TransactionOptions::new().set_transaction_statement().is_none());
    }

    #[test]
    fn test_set_transaction_statement() {
        let options = TransactionOptions::new()
            .isolation_level(IsolationLevel::Serializable)
            .read_only();
        assert_eq!(
            options.set_transaction_statement().as_deref(),
            Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY")
        );
    }
}
