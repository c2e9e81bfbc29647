//! # sqlweave-cli
//!
//! Command line runner for the sqlweave library: executes SQL scripts
//! statement by statement and prints paginated search results as JSON.
//!
//! ```bash
//! sqlweave --database-url app.db script schema.sql
//! sqlweave --database-url app.db search "SELECT * FROM users WHERE team = ?1" \
//!     --param red --size 10 --order-by "ORDER BY user_id"
//! ```

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Command};
pub use commands::{SearchRequest, execute, parse_param, run_script, run_search};
pub use config::{BackendKind, WeaveConfig};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlweave={},sqlweave_cli={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
