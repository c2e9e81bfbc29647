use std::fmt::Debug;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::Object;
use serde_json::{Number, Value};
use tokio_postgres::Row;
use tokio_postgres::types::{ToSql, Type};

use crate::driver::Connection;
use crate::error::{BackendError, QueryError, QueryResult, TransactionError};
use crate::transaction::TransactionOptions;
use crate::types::{ResultSet, SqlParam};

use super::driver::BACKEND_NAME;

type BoxedParam = Box<dyn ToSql + Sync + Send>;

pub(super) fn query_failed(e: tokio_postgres::Error) -> BackendError {
    BackendError::QueryFailed {
        backend_name: BACKEND_NAME.to_string(),
        message: e.to_string(),
    }
}

/// A pooled PostgreSQL connection.
pub struct PostgresConnection {
    client: Object,
    in_transaction: bool,
}

impl Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl PostgresConnection {
    pub(super) fn new(client: Object) -> Self {
        Self {
            client,
            in_transaction: false,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    async fn prepare(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> QueryResult<(tokio_postgres::Statement, Vec<BoxedParam>)> {
        let stmt = self.client.prepare_cached(sql).await.map_err(query_failed)?;
        if stmt.params().len() != params.len() {
            return Err(QueryError::invalid_input(format!(
                "statement expects {} parameter(s), {} bound",
                stmt.params().len(),
                params.len()
            )));
        }
        let boxed = params
            .iter()
            .zip(stmt.params())
            .map(|(param, ty)| bind(param, ty))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok((stmt, boxed))
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn begin(&mut self) -> QueryResult<()> {
        self.begin_with(&TransactionOptions::default()).await
    }

    async fn begin_with(&mut self, options: &TransactionOptions) -> QueryResult<()> {
        let mut statement = format!(
            "BEGIN ISOLATION LEVEL {}",
            options.isolation_level.as_sql()
        );
        if options.read_only {
            statement.push_str(" READ ONLY");
        }
        self.client
            .batch_execute(&statement)
            .await
            .map_err(|e| TransactionError::BeginFailed {
                reason: e.to_string(),
            })?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> QueryResult<()> {
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| TransactionError::CommitFailed {
                reason: e.to_string(),
            })?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> QueryResult<()> {
        self.in_transaction = false;
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| TransactionError::RollbackFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn release(self) -> QueryResult<()> {
        if self.in_transaction {
            self.client
                .batch_execute("ROLLBACK")
                .await
                .map_err(|e| TransactionError::ReleaseFailed {
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    async fn fetch(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<ResultSet> {
        let (stmt, boxed) = self.prepare(sql, params).await?;
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = self.client.query(&stmt, &refs).await.map_err(query_failed)?;

        let fields: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let out = rows
            .iter()
            .map(|row| {
                stmt.columns()
                    .iter()
                    .enumerate()
                    .map(|(i, column)| cell_to_json(row, i, column.type_()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_failed)?;
        Ok(ResultSet::new(fields, out))
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<u64> {
        let (stmt, boxed) = self.prepare(sql, params).await?;
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        self.client
            .execute(&stmt, &refs)
            .await
            .map_err(|e| query_failed(e).into())
    }
}

/// Converts a parameter to the Rust type matching the server-inferred type.
fn bind(param: &SqlParam, ty: &Type) -> QueryResult<BoxedParam> {
    let out_of_range = |v: &i64| QueryError::invalid_input(format!("{} does not fit {}", v, ty));

    let boxed: BoxedParam = match param {
        SqlParam::Null => null_of(ty),
        SqlParam::Bool(b) => Box::new(*b),
        SqlParam::Integer(i) => {
            if *ty == Type::INT2 {
                Box::new(i16::try_from(*i).map_err(|_| out_of_range(i))?)
            } else if *ty == Type::INT4 {
                Box::new(i32::try_from(*i).map_err(|_| out_of_range(i))?)
            } else if *ty == Type::FLOAT4 {
                Box::new(*i as f32)
            } else if *ty == Type::FLOAT8 {
                Box::new(*i as f64)
            } else if is_text(ty) {
                Box::new(i.to_string())
            } else {
                Box::new(*i)
            }
        }
        SqlParam::Float(f) => {
            if *ty == Type::FLOAT4 {
                Box::new(*f as f32)
            } else {
                Box::new(*f)
            }
        }
        SqlParam::Timestamp(ts) => {
            if *ty == Type::TIMESTAMP {
                Box::new(ts.naive_utc())
            } else if *ty == Type::DATE {
                Box::new(ts.date_naive())
            } else if is_text(ty) {
                Box::new(ts.to_rfc3339())
            } else {
                Box::new(*ts)
            }
        }
        SqlParam::Text(s) => {
            if *ty == Type::UUID {
                let id = uuid::Uuid::parse_str(s)
                    .map_err(|e| QueryError::invalid_input(format!("invalid uuid '{}': {}", s, e)))?;
                Box::new(id)
            } else if *ty == Type::JSON || *ty == Type::JSONB {
                let value = serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()));
                Box::new(value)
            } else {
                Box::new(s.clone())
            }
        }
    };
    Ok(boxed)
}

fn null_of(ty: &Type) -> BoxedParam {
    if *ty == Type::BOOL {
        Box::new(None::<bool>)
    } else if *ty == Type::INT2 {
        Box::new(None::<i16>)
    } else if *ty == Type::INT4 {
        Box::new(None::<i32>)
    } else if *ty == Type::INT8 {
        Box::new(None::<i64>)
    } else if *ty == Type::FLOAT4 {
        Box::new(None::<f32>)
    } else if *ty == Type::FLOAT8 {
        Box::new(None::<f64>)
    } else if *ty == Type::TIMESTAMPTZ {
        Box::new(None::<DateTime<Utc>>)
    } else if *ty == Type::TIMESTAMP {
        Box::new(None::<NaiveDateTime>)
    } else if *ty == Type::DATE {
        Box::new(None::<NaiveDate>)
    } else if *ty == Type::UUID {
        Box::new(None::<uuid::Uuid>)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        Box::new(None::<Value>)
    } else {
        Box::new(None::<String>)
    }
}

fn is_text(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

fn float(f: Option<f64>) -> Value {
    f.and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn cell_to_json(row: &Row, i: usize, ty: &Type) -> Result<Value, tokio_postgres::Error> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(i)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(i)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(i)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(i)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        Some(float(row.try_get::<_, Option<f32>>(i)?.map(f64::from)))
    } else if *ty == Type::FLOAT8 {
        Some(float(row.try_get::<_, Option<f64>>(i)?))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(i)?
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(i)?
            .map(|ts| Value::String(ts.to_rfc3339()))
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(i)?
            .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(i)?
            .map(|d| Value::String(d.to_string()))
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(i)?
            .map(|id| Value::String(id.to_string()))
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(i)?
            .map(|bytes| Value::String(BASE64.encode(bytes)))
    } else {
        // Text-like and unknown types; types without a `String` decoding
        // surface as a query error.
        row.try_get::<_, Option<String>>(i)?.map(Value::String)
    };
    Ok(value.unwrap_or(Value::Null))
}
