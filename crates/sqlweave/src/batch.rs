//! Record-by-record batch execution with partial success.

use std::sync::Arc;

use tracing::{info, warn};

use crate::driver::Driver;
use crate::error::QueryResult;
use crate::transaction::TransactionCoordinator;

/// One input record of a batch and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord<T> {
    record_number: usize,
    data: T,
    error: Option<String>,
}

impl<T> BatchRecord<T> {
    /// Creates a record.
    pub fn new(record_number: usize, data: T) -> Self {
        Self {
            record_number,
            data,
            error: None,
        }
    }

    /// Wraps items as records numbered from 1.
    pub fn from_items<I>(items: I) -> Vec<Self>
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(i, data)| Self::new(i + 1, data))
            .collect()
    }

    /// Position of the record in its input, starting at 1.
    pub fn record_number(&self) -> usize {
        self.record_number
    }

    /// The record payload.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// The error message recorded for this record, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true if no error was recorded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.error = Some(message);
    }
}

/// How records share connections and transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// One connection for the whole batch, no transaction.
    #[default]
    SharedConnection,
    /// A transaction of its own for each record.
    TransactionPerRecord,
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records processed.
    pub total: usize,
    /// Records whose operation succeeded.
    pub succeeded: usize,
    /// Records whose operation failed.
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &QueryResult<()>) {
        self.total += 1;
        if outcome.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Runs an operation over a slice of records.
#[derive(Debug)]
pub struct BatchRunner<D> {
    coordinator: TransactionCoordinator<D>,
    mode: BatchMode,
}

impl<D: Driver> BatchRunner<D> {
    /// Creates a runner sharing one connection across the batch.
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(driver),
            mode: BatchMode::default(),
        }
    }

    /// Sets the connection mode.
    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Runs `op` on every record in order.
    ///
    /// A failing record gets the error message stored on it and the run moves
    /// on. The returned error is reserved for failures of the batch itself,
    /// such as not getting a connection in shared mode.
    pub async fn run<T, F>(
        &self,
        records: &mut [BatchRecord<T>],
        mut op: F,
    ) -> QueryResult<BatchReport>
    where
        F: AsyncFnMut(&mut D::Connection, &T) -> QueryResult<()>,
    {
        let report = match self.mode {
            BatchMode::SharedConnection => {
                self.coordinator
                    .with_connection(async |conn| {
                        let mut report = BatchReport::default();
                        for record in records.iter_mut() {
                            let outcome = op(&mut *conn, &record.data).await;
                            settle(record, &outcome);
                            report.record(&outcome);
                        }
                        Ok(report)
                    })
                    .await?
            }
            BatchMode::TransactionPerRecord => {
                let mut report = BatchReport::default();
                for record in records.iter_mut() {
                    let data = &record.data;
                    let outcome = self
                        .coordinator
                        .transactional(async |conn| op(conn, data).await)
                        .await;
                    settle(record, &outcome);
                    report.record(&outcome);
                }
                report
            }
        };

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "Batch finished"
        );
        Ok(report)
    }
}

fn settle<T>(record: &mut BatchRecord<T>, outcome: &QueryResult<()>) {
    if let Err(e) = outcome {
        warn!(record = record.record_number, error = %e, "Batch record failed");
        record.fail(e.to_string());
    }
}
