//! Driver adapter contract.
//!
//! The core never talks to a database directly. A backend implements
//! [`Driver`] (connection acquisition and dialect details) and
//! [`Connection`] (statement execution and transaction control), and every
//! component takes the driver explicitly.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sqlweave::backends::sqlite::SqliteDriver;
//! use sqlweave::pagination::Paginator;
//!
//! let driver = Arc::new(SqliteDriver::open("app.db")?);
//! let paginator = Paginator::new(driver);
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::error;

use crate::error::QueryResult;
use crate::transaction::TransactionOptions;
use crate::types::{Placeholder, ResultSet, SqlParam};

/// A connection-like resource checked out of a driver.
///
/// A connection is used by one logical operation at a time and is handed
/// back with [`release`](Self::release), exactly once.
#[async_trait]
pub trait Connection: Send + Sized {
    /// Starts a transaction with default options.
    async fn begin(&mut self) -> QueryResult<()>;

    /// Starts a transaction with explicit options.
    ///
    /// The default issues `BEGIN` followed by a standard
    /// `SET TRANSACTION` statement when the options ask for anything other
    /// than the defaults. If that statement fails the transaction is rolled
    /// back before the error is returned.
    async fn begin_with(&mut self, options: &TransactionOptions) -> QueryResult<()> {
        self.begin().await?;
        if let Some(statement) = options.set_transaction_statement() {
            if let Err(err) = self.execute(&statement, &[]).await {
                if let Err(rollback_err) = self.rollback().await {
                    error!(error = %rollback_err, "Rollback after failed SET TRANSACTION failed");
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Commits the current transaction.
    async fn commit(&mut self) -> QueryResult<()>;

    /// Rolls back the current transaction.
    async fn rollback(&mut self) -> QueryResult<()>;

    /// Hands the connection back to its driver.
    async fn release(self) -> QueryResult<()>;

    /// Runs a query and returns its rows.
    async fn fetch(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<ResultSet>;

    /// Runs a query and returns its first row keyed by column name.
    async fn fetch_one(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> QueryResult<Option<Map<String, Value>>> {
        Ok(self.fetch(sql, params).await?.first_row())
    }

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<u64>;
}

/// A database driver: hands out connections and knows its SQL dialect.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The connection type this driver hands out.
    type Connection: Connection;

    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Checks out a connection.
    async fn acquire(&self) -> QueryResult<Self::Connection>;

    /// Placeholder syntax the driver binds.
    fn placeholder(&self) -> Placeholder;

    /// Trailing fragment restricting a query to `limit` rows from `offset`.
    fn limit_offset(&self, limit: u64, offset: u64) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }

    /// Executes one statement outside any transaction on a fresh connection.
    async fn execute_raw(&self, sql: &str) -> QueryResult<u64> {
        let mut conn = self.acquire().await?;
        let result = conn.execute(sql, &[]).await;
        let released = conn.release().await;
        let affected = result?;
        released?;
        Ok(affected)
    }
}
