//! SQL script loading.
//!
//! Scripts are split lexically, with no SQL parsing:
//!
//! 1. block comments `/* ... */` are removed, including ones spanning lines;
//! 2. line comments starting with `--` or `//` are removed up to end of line;
//! 3. the text is split on `;` followed by optional spaces or tabs and then a
//!    newline or the end of the script;
//! 4. pieces are trimmed and empty ones dropped.
//!
//! Comment markers and statement terminators inside string literals are not
//! recognised as such. A literal containing `--`, `//` or `;` followed by a
//! newline is cut at that point.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::driver::Driver;
use crate::error::QueryResult;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:--|//).*$").expect("line comment pattern is valid"));

static TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";[ \t]*(?:\r?\n|\z)").expect("terminator pattern is valid"));

/// Splits a script into executable statements.
pub fn split_statements(script: &str) -> Vec<String> {
    let without_blocks = BLOCK_COMMENT.replace_all(script, "");
    let without_comments = LINE_COMMENT.replace_all(&without_blocks, "");

    TERMINATOR
        .split(&without_comments)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads a script from disk.
pub fn read_script(path: impl AsRef<Path>) -> QueryResult<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// A statement that failed to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    /// Zero-based position of the statement in the script.
    pub index: usize,
    /// The statement text.
    pub statement: String,
    /// The driver's error message.
    pub message: String,
}

/// Outcome of running a script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Number of statements found in the script.
    pub statements: usize,
    /// Number of statements that executed successfully.
    pub succeeded: usize,
    /// Statements that failed, in script order.
    pub failures: Vec<StatementFailure>,
}

impl ScriptReport {
    /// Returns true if any statement failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Executes scripts statement by statement.
#[derive(Debug)]
pub struct ScriptLoader<D> {
    driver: Arc<D>,
}

impl<D: Driver> ScriptLoader<D> {
    /// Creates a loader over a driver.
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }

    /// Runs every statement of `script`.
    ///
    /// Each statement goes through the driver's raw execute, outside any
    /// transaction. A failing statement is logged and recorded and execution
    /// continues with the next one.
    pub async fn run(&self, script: &str) -> ScriptReport {
        let statements = split_statements(script);
        let mut report = ScriptReport {
            statements: statements.len(),
            ..Default::default()
        };

        for (index, statement) in statements.into_iter().enumerate() {
            debug!(index, sql = %statement, "Executing script statement");
            match self.driver.execute_raw(&statement).await {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    warn!(index, sql = %statement, error = %e, "Script statement failed");
                    report.failures.push(StatementFailure {
                        index,
                        statement,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            statements = report.statements,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "Script finished"
        );
        report
    }

    /// Reads a script file and runs it.
    pub async fn run_file(&self, path: impl AsRef<Path>) -> QueryResult<ScriptReport> {
        let script = read_script(path)?;
        Ok(self.run(&script).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blocks() {
        let stmts = split_statements("-- c\nSELECT 1;\n/* block */\nSELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_multiline_block_comment() {
        let stmts = split_statements("/* first\n second;\n */CREATE TABLE t (id INT);\n");
        assert_eq!(stmts, vec!["CREATE TABLE t (id INT)"]);
    }

    #[test]
    fn test_slash_comments_and_trailing_tabs() {
        let stmts = split_statements("INSERT INTO t VALUES (1); \t// seed\r\nINSERT INTO t VALUES (2);");
        assert_eq!(stmts, vec!["INSERT INTO t VALUES (1)", "INSERT INTO t VALUES (2)"]);
    }

    #[test]
    fn test_semicolon_mid_line_does_not_split() {
        let stmts = split_statements("SELECT ';' AS x; SELECT 2;\n");
        assert_eq!(stmts, vec!["SELECT ';' AS x; SELECT 2"]);
    }

    #[test]
    fn test_empty_statements_dropped() {
        assert!(split_statements(";\n;\n  \n-- only a comment\n").is_empty());
        assert!(split_statements("").is_empty());
    }

    #[test]
    fn test_read_script_missing_file() {
        let err = read_script("/definitely/not/here.sql").unwrap_err();
        assert!(matches!(err, crate::error::QueryError::Io(_)));
    }
}
