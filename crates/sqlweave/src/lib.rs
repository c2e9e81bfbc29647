//! sqlweave: dynamic predicates, two-phase pagination and transactional
//! execution over raw SQL.
//!
//! This crate sits between application code and a SQL driver. It does not
//! generate SQL from a schema; callers write the base query and this crate
//! appends filter clauses, pages the result, turns flat rows into nested
//! objects and scopes connections and transactions.
//!
//! # Features
//!
//! - **Dynamic predicates**: equality, wildcard `LIKE`, half-open ranges and
//!   `IN` lists that skip themselves when the value is empty
//! - **Two-phase pagination**: a count query, then a bounded page fetch
//! - **Materialization**: `snake_case` and dotted column names become nested
//!   camelCase attributes, deserialized into any `serde` type
//! - **Transactions**: commit on success, rollback on failure, release always
//! - **Scripts and batches**: statement-by-statement execution with partial
//!   success reporting
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite through an `r2d2` pool
//! - `postgres` - PostgreSQL through a `deadpool-postgres` pool
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde::Deserialize;
//! use sqlweave::backends::sqlite::SqliteDriver;
//! use sqlweave::{Paginator, PaginationResult};
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct User {
//!     user_id: i64,
//!     user_name: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Arc::new(SqliteDriver::open("./data/app.db")?);
//! let paginator = Paginator::new(driver);
//!
//! let mut criteria = paginator
//!     .criteria("SELECT user_id, user_name FROM users WHERE 1=1")
//!     .with_order_by("ORDER BY user_name")
//!     .with_page(2, 20);
//! criteria.add_like("jo*", "user_name");
//!
//! let page: PaginationResult<User> = paginator.paginate(&criteria).await?;
//! println!("{} of {} users", page.list().len(), page.count());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod batch;
pub mod driver;
pub mod error;
pub mod materialize;
pub mod pagination;
pub mod predicate;
pub mod script;
pub mod transaction;
pub mod types;

pub use batch::{BatchMode, BatchRecord, BatchReport, BatchRunner};
pub use driver::{Connection, Driver};
pub use error::{QueryError, QueryResult};
pub use materialize::Materializer;
pub use pagination::Paginator;
pub use predicate::{DynamicQuery, SearchCriteria};
pub use script::{ScriptLoader, ScriptReport};
pub use transaction::{IsolationLevel, TransactionCoordinator, TransactionOptions};
pub use types::{PageRequest, PaginationResult, Placeholder, ResultSet, SqlParam};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
