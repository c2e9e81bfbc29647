//! sqlweave command line runner.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sqlweave_cli::{BackendKind, Cli, execute, init_logging};
use tracing::info;

#[cfg(feature = "sqlite")]
use sqlweave::backends::sqlite::SqliteDriver;

#[cfg(feature = "postgres")]
use sqlweave::backends::postgres::PostgresDriver;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let Cli { config, command } = Cli::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(backend = %config.backend, "Starting sqlweave");

    match config.backend {
        BackendKind::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let path = config.sqlite_path();
                info!(database = %path, "Opening SQLite database");
                let driver = if path == ":memory:" {
                    SqliteDriver::in_memory()?
                } else {
                    SqliteDriver::open(path)?
                };
                execute(Arc::new(driver), command, &config).await
            }
            #[cfg(not(feature = "sqlite"))]
            {
                anyhow::bail!("SQLite backend requires the 'sqlite' feature")
            }
        }
        BackendKind::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("The postgres backend requires a database URL"))?;
                info!("Connecting to PostgreSQL");
                let driver = PostgresDriver::from_url(url).await?;
                execute(Arc::new(driver), command, &config).await
            }
            #[cfg(not(feature = "postgres"))]
            {
                anyhow::bail!("PostgreSQL backend requires the 'postgres' feature")
            }
        }
    }
}
