//! Subcommand implementations, generic over the driver.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use sqlweave::script::{ScriptLoader, ScriptReport};
use sqlweave::types::{PaginationResult, SqlParam};
use sqlweave::{Driver, Paginator};
use tracing::info;

use crate::cli::Command;
use crate::config::WeaveConfig;

/// A search as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub page: u64,
    pub size: u64,
    pub order_by: Option<String>,
}

/// Interprets a `--param` value.
pub fn parse_param(raw: &str) -> SqlParam {
    if let Some(text) = raw.strip_prefix("text:") {
        return SqlParam::text(text);
    }
    match raw {
        "null" => SqlParam::Null,
        "true" => SqlParam::Bool(true),
        "false" => SqlParam::Bool(false),
        _ => match (raw.parse::<i64>(), raw.parse::<f64>()) {
            (Ok(i), _) => SqlParam::Integer(i),
            (_, Ok(f)) if f.is_finite() => SqlParam::Float(f),
            _ => SqlParam::text(raw),
        },
    }
}

/// Runs a script file and logs a summary.
pub async fn run_script<D: Driver>(driver: Arc<D>, file: &Path) -> anyhow::Result<ScriptReport> {
    let report = ScriptLoader::new(driver)
        .run_file(file)
        .await
        .with_context(|| format!("Failed to read script {}", file.display()))?;

    for failure in &report.failures {
        eprintln!(
            "statement {} failed: {}\n  {}",
            failure.index + 1,
            failure.message,
            failure.statement
        );
    }
    info!(
        file = %file.display(),
        statements = report.statements,
        failed = report.failures.len(),
        "Script complete"
    );
    Ok(report)
}

/// Runs one page of a search.
///
/// Without an ordering fragment this is a quick search over the raw query;
/// with one, the query becomes criteria so the ordering is applied to the
/// page fetch only.
pub async fn run_search<D: Driver>(
    driver: Arc<D>,
    request: &SearchRequest,
) -> anyhow::Result<PaginationResult<Value>> {
    let paginator = Paginator::new(driver);
    let result = match &request.order_by {
        Some(order_by) => {
            let criteria = paginator
                .criteria(request.sql.as_str())
                .bind(request.params.iter().cloned())
                .with_order_by(order_by.as_str())
                .with_page(request.page, request.size);
            paginator.paginate(&criteria).await?
        }
        None => {
            paginator
                .quick_search(&request.sql, &request.params, request.page, request.size)
                .await?
        }
    };
    Ok(result)
}

/// Runs a subcommand and maps its outcome to an exit code.
pub async fn execute<D: Driver>(
    driver: Arc<D>,
    command: Command,
    config: &WeaveConfig,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::Script { file } => {
            let report = run_script(driver, &file).await?;
            println!(
                "{} of {} statement(s) succeeded",
                report.succeeded, report.statements
            );
            if report.has_failures() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Search {
            sql,
            params,
            page,
            size,
            order_by,
        } => {
            let request = SearchRequest {
                sql,
                params: params.iter().map(|p| parse_param(p)).collect(),
                page,
                size: config.page_size(size),
                order_by,
            };
            let result = run_search(driver, &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
