use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{Connection as _, Driver};
use crate::error::{BackendError, QueryResult};
use crate::types::Placeholder;

use super::connection::{SqliteConnection, query_failed};

pub(super) const BACKEND_NAME: &str = "sqlite";

/// Configuration for the SQLite driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Enable foreign key constraints on every connection.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_foreign_keys: true,
        }
    }
}

/// SQLite driver over a pooled database file.
pub struct SqliteDriver {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteConfig,
    is_memory: bool,
}

impl Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

impl SqliteDriver {
    /// Opens or creates a database file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> QueryResult<Self> {
        Self::with_config(path, SqliteConfig::default())
    }

    /// Creates an in-memory database.
    ///
    /// Every SQLite connection to `:memory:` is a separate database, so the
    /// pool is limited to one long-lived connection. Acquiring a second
    /// connection while the first is checked out waits for the connection
    /// timeout.
    pub fn in_memory() -> QueryResult<Self> {
        let config = SqliteConfig {
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let manager = Self::configure(SqliteConnectionManager::memory(), &config);
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .max_lifetime(None)
            .idle_timeout(None)
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(connection_failed)?;
        Ok(Self {
            pool,
            config,
            is_memory: true,
        })
    }

    /// Opens or creates a database file.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteConfig) -> QueryResult<Self> {
        let manager = Self::configure(SqliteConnectionManager::file(path.as_ref()), &config);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(config.min_connections))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(connection_failed)?;

        debug!(path = %path.as_ref().display(), "Opened SQLite pool");
        Ok(Self {
            pool,
            config,
            is_memory: false,
        })
    }

    fn configure(manager: SqliteConnectionManager, config: &SqliteConfig) -> SqliteConnectionManager {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let foreign_keys = config.enable_foreign_keys;
        manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.execute_batch("PRAGMA foreign_keys = ON")?;
            }
            Ok(())
        })
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the driver configuration.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

fn connection_failed(e: r2d2::Error) -> BackendError {
    BackendError::ConnectionFailed {
        backend_name: BACKEND_NAME.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn acquire(&self) -> QueryResult<Self::Connection> {
        let conn = self.pool.get().map_err(connection_failed)?;
        Ok(SqliteConnection::new(conn))
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    /// Runs the text through `execute_batch`, which also accepts statements
    /// that return rows.
    async fn execute_raw(&self, sql: &str) -> QueryResult<u64> {
        let conn = self.acquire().await?;
        let affected = conn
            .raw()
            .execute_batch(sql)
            .map(|()| conn.raw().changes())
            .map_err(query_failed);
        conn.release().await?;
        Ok(affected? as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: SqliteConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.enable_foreign_keys);
    }

    #[test]
    fn test_in_memory_driver() {
        let driver = SqliteDriver::in_memory().unwrap();
        assert!(driver.is_memory());
        assert_eq!(driver.name(), "sqlite");
        assert_eq!(driver.placeholder(), Placeholder::Question);
        assert_eq!(driver.limit_offset(10, 20), "LIMIT 10 OFFSET 20");
    }
}
