//! Runner configuration.
//!
//! Every option can be given on the command line or through the environment.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SQLWEAVE_BACKEND` | sqlite | Database backend (`sqlite`, `postgres`) |
//! | `SQLWEAVE_DATABASE_URL` | sqlweave.db | SQLite file path or `postgres://` URL |
//! | `SQLWEAVE_LOG_LEVEL` | info | Log level |
//! | `SQLWEAVE_DEFAULT_PAGE_SIZE` | 25 | Page size when `--size` is omitted |
//! | `SQLWEAVE_MAX_PAGE_SIZE` | 1000 | Largest page size a search may request |

use std::fmt;

use clap::{Parser, ValueEnum};
use sqlweave::types::DEFAULT_PAGE_SIZE;

/// Default SQLite database file.
pub const DEFAULT_SQLITE_PATH: &str = "sqlweave.db";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Database backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackendKind {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// PostgreSQL server.
    Postgres,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// Connection and paging settings shared by every subcommand.
#[derive(Debug, Clone, Parser)]
pub struct WeaveConfig {
    /// Database backend.
    #[arg(long, env = "SQLWEAVE_BACKEND", value_enum, default_value_t = BackendKind::Sqlite)]
    pub backend: BackendKind,

    /// SQLite file path or PostgreSQL connection URL.
    #[arg(long, env = "SQLWEAVE_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SQLWEAVE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Page size used when a search does not give one.
    #[arg(long, env = "SQLWEAVE_DEFAULT_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub default_page_size: u64,

    /// Largest page size a search may request.
    #[arg(long, env = "SQLWEAVE_MAX_PAGE_SIZE", default_value = "1000")]
    pub max_page_size: u64,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database_url: None,
            log_level: "info".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 1000,
        }
    }
}

impl WeaveConfig {
    /// Reads the configuration from environment variables only.
    pub fn from_env() -> Self {
        Self::try_parse_from(["sqlweave"]).unwrap_or_default()
    }

    /// The SQLite file to open.
    pub fn sqlite_path(&self) -> &str {
        match self.database_url.as_deref() {
            Some(url) => url.strip_prefix("sqlite://").unwrap_or(url),
            None => DEFAULT_SQLITE_PATH,
        }
    }

    /// The page size for a search, capped at the maximum.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if self.backend == BackendKind::Postgres && self.database_url.is_none() {
            errors.push("The postgres backend requires a database URL".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            database_url: Some(":memory:".to_string()),
            log_level: "debug".to_string(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}
