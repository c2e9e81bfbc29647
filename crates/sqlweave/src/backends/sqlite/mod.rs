//! SQLite driver.
//!
//! Connections come from an `r2d2` pool; statements run synchronously on the
//! pooled connection. Cells are returned as JSON values: integers and reals
//! as numbers, text as strings, BLOBs as base64 strings.
//!
//! SQLite transactions are always serializable, so every requested isolation
//! level is accepted. Read-only transactions start `DEFERRED`, all others
//! `IMMEDIATE`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlweave::backends::sqlite::SqliteDriver;
//! use sqlweave::pagination::Paginator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Arc::new(SqliteDriver::open("./data/app.db")?);
//! let paginator = Paginator::new(driver);
//! let mut criteria = paginator.criteria("SELECT id, user_name FROM users WHERE 1=1");
//! criteria.add_like("jo*", "user_name");
//! # Ok(())
//! # }
//! ```

mod connection;
mod driver;

pub use connection::SqliteConnection;
pub use driver::{SqliteConfig, SqliteDriver};
