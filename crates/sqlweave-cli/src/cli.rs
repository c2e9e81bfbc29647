//! Command line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::WeaveConfig;

/// Runs SQL scripts and paginated searches against a database.
#[derive(Debug, Parser)]
#[command(name = "sqlweave", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub config: WeaveConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// What to run.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a SQL script statement by statement; exits non-zero if any fails.
    Script {
        /// Path to the script.
        file: PathBuf,
    },

    /// Run one page of a query and print the result as JSON.
    Search {
        /// The query, using the backend's placeholder syntax.
        sql: String,

        /// Positional parameter value; repeat in placeholder order.
        /// `null`, `true`, `false` and numbers are typed; prefix with
        /// `text:` to force a string.
        #[arg(long = "param")]
        params: Vec<String>,

        /// Page number, starting at 1.
        #[arg(long, default_value = "1")]
        page: u64,

        /// Page size; defaults to the configured default page size.
        #[arg(long)]
        size: Option<u64>,

        /// Ordering fragment appended after the query, e.g. `ORDER BY id`.
        #[arg(long)]
        order_by: Option<String>,
    },
}
