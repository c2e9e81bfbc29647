//! Test infrastructure for the query layer.
//!
//! - [`mock`]: a driver that records every call and serves rows from an
//!   in-memory table, with switches to make individual steps fail
//! - [`fixtures`]: SQLite databases on temporary files, seeded with users

#![allow(dead_code)]

#[cfg(feature = "sqlite")]
pub mod fixtures;
pub mod mock;

#[cfg(feature = "sqlite")]
pub use fixtures::*;
pub use mock::*;
