use std::fmt::Debug;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{ToSql, params_from_iter};
use serde_json::{Number, Value};

use crate::driver::Connection;
use crate::error::{BackendError, QueryResult, TransactionError};
use crate::transaction::TransactionOptions;
use crate::types::{ResultSet, SqlParam};

use super::driver::BACKEND_NAME;

pub(super) fn query_failed(e: rusqlite::Error) -> BackendError {
    BackendError::QueryFailed {
        backend_name: BACKEND_NAME.to_string(),
        message: e.to_string(),
    }
}

/// A pooled SQLite connection.
///
/// Dropping it returns it to the pool. A connection released in the middle
/// of a transaction is rolled back first.
pub struct SqliteConnection {
    conn: PooledConnection<SqliteConnectionManager>,
    in_transaction: bool,
}

impl Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl SqliteConnection {
    pub(super) fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }

    /// The underlying `rusqlite` connection.
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Returns true between a successful begin and its commit or rollback.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn start(&mut self, statement: &str) -> QueryResult<()> {
        self.conn
            .execute_batch(statement)
            .map_err(|e| TransactionError::BeginFailed {
                reason: e.to_string(),
            })?;
        self.in_transaction = true;
        Ok(())
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn begin(&mut self) -> QueryResult<()> {
        self.start("BEGIN IMMEDIATE")
    }

    async fn begin_with(&mut self, options: &TransactionOptions) -> QueryResult<()> {
        if options.read_only {
            self.start("BEGIN DEFERRED")
        } else {
            self.start("BEGIN IMMEDIATE")
        }
    }

    async fn commit(&mut self) -> QueryResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| TransactionError::CommitFailed {
                reason: e.to_string(),
            })?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> QueryResult<()> {
        self.in_transaction = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| TransactionError::RollbackFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn release(self) -> QueryResult<()> {
        if self.in_transaction && !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| TransactionError::ReleaseFailed {
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn fetch(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<ResultSet> {
        let mut stmt = self.conn.prepare(sql).map_err(query_failed)?;
        let fields: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = fields.len();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(query_failed)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_failed)? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_to_json(row.get_ref(i).map_err(query_failed)?));
            }
            out.push(cells);
        }
        Ok(ResultSet::new(fields, out))
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<u64> {
        let affected = self
            .conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(query_failed)?;
        Ok(affected as u64)
    }
}

fn cell_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlParam::Float(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlParam::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
            SqlParam::Timestamp(ts) => ToSqlOutput::Owned(SqliteValue::Text(ts.to_rfc3339())),
            SqlParam::Null => ToSqlOutput::Owned(SqliteValue::Null),
        })
    }
}
