//! Driver implementations.
//!
//! Each backend is gated behind a feature flag.
//!
//! | Backend | Feature | Placeholders |
//! |---------|---------|--------------|
//! | SQLite | `sqlite` (default) | `?1`, `?2`, ... |
//! | PostgreSQL | `postgres` | `$1`, `$2`, ... |

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;
