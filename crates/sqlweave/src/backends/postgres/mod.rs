//! PostgreSQL driver.
//!
//! Connections come from a `deadpool-postgres` pool. Statements are
//! prepared (and cached per connection) before binding, so each
//! [`SqlParam`](crate::types::SqlParam) is converted to the Rust type the
//! server inferred for its placeholder: an integer bound against an `int4`
//! column is sent as `i32`, a timestamp against `timestamp` as a naive UTC
//! value, text against `uuid` or `jsonb` is parsed first.

mod connection;
mod driver;

pub use connection::PostgresConnection;
pub use driver::{PostgresConfig, PostgresDriver, PostgresSslMode};
