//! Recording mock driver.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use sqlweave::driver::{Connection, Driver};
use sqlweave::error::{BackendError, QueryError, QueryResult, TransactionError};
use sqlweave::types::{Placeholder, ResultSet, SqlParam};

/// One call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquire,
    Begin,
    Commit,
    Rollback,
    Release,
    Fetch(String),
    Execute(String),
}

impl Event {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Event::Fetch(_))
    }

    pub fn is_count(&self) -> bool {
        matches!(self, Event::Fetch(sql) if sql.starts_with("SELECT COUNT(*) AS cc"))
    }
}

/// Steps that can be made to fail.
#[derive(Debug, Default, Clone)]
pub struct Failures {
    pub acquire: bool,
    pub begin: bool,
    pub commit: bool,
    pub rollback: bool,
    pub release: bool,
    /// Fail any execute whose SQL contains this text.
    pub execute_containing: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    events: Vec<Event>,
    params: Vec<Vec<SqlParam>>,
    table: ResultSet,
    failures: Failures,
}

/// A driver serving a fixed table and recording every call.
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    placeholder: Placeholder,
}

impl MockDriver {
    /// A driver with an empty table.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            placeholder: Placeholder::Dollar,
        }
    }

    /// A driver serving `count` rows of `{id, user_name}`.
    pub fn with_rows(count: usize) -> Self {
        let driver = Self::new();
        let rows = (1..=count)
            .map(|i| vec![json!(i), json!(format!("user_{:02}", i))])
            .collect();
        driver.state.lock().table =
            ResultSet::new(vec!["id".to_string(), "user_name".to_string()], rows);
        driver
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn with_failures(self, failures: Failures) -> Self {
        self.state.lock().failures = failures;
        self
    }

    pub fn set_table(&self, table: ResultSet) {
        self.state.lock().table = table;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// Parameters bound to each fetch and execute, in call order.
    pub fn bound_params(&self) -> Vec<Vec<SqlParam>> {
        self.state.lock().params.clone()
    }

    pub fn clear_events(&self) {
        let mut state = self.state.lock();
        state.events.clear();
        state.params.clear();
    }

    pub fn count_of(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Fetch(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }
}

fn mock_error(message: &str) -> QueryError {
    BackendError::QueryFailed {
        backend_name: "mock".to_string(),
        message: message.to_string(),
    }
    .into()
}

#[async_trait]
impl Driver for MockDriver {
    type Connection = MockConnection;

    fn name(&self) -> &'static str {
        "mock"
    }

    async fn acquire(&self) -> QueryResult<MockConnection> {
        let mut state = self.state.lock();
        if state.failures.acquire {
            return Err(BackendError::ConnectionFailed {
                backend_name: "mock".to_string(),
                message: "pool exhausted".to_string(),
            }
            .into());
        }
        state.events.push(Event::Acquire);
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }

    fn placeholder(&self) -> Placeholder {
        self.placeholder
    }
}

/// Connection handed out by [`MockDriver`].
#[derive(Debug)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn record(&self, event: Event) {
        self.state.lock().events.push(event);
    }
}

/// Reads the trailing `LIMIT n OFFSET m` of a page query.
fn limit_offset(sql: &str) -> Option<(usize, usize)> {
    let (_, tail) = sql.rsplit_once("LIMIT ")?;
    let mut parts = tail.split_whitespace();
    let limit = parts.next()?.parse().ok()?;
    let offset = match (parts.next(), parts.next()) {
        (Some("OFFSET"), Some(n)) => n.parse().ok()?,
        _ => 0,
    };
    Some((limit, offset))
}

#[async_trait]
impl Connection for MockConnection {
    async fn begin(&mut self) -> QueryResult<()> {
        self.record(Event::Begin);
        if self.state.lock().failures.begin {
            return Err(TransactionError::BeginFailed {
                reason: "mock begin failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn commit(&mut self) -> QueryResult<()> {
        self.record(Event::Commit);
        if self.state.lock().failures.commit {
            return Err(TransactionError::CommitFailed {
                reason: "mock commit failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn rollback(&mut self) -> QueryResult<()> {
        self.record(Event::Rollback);
        if self.state.lock().failures.rollback {
            return Err(TransactionError::RollbackFailed {
                reason: "mock rollback failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn release(self) -> QueryResult<()> {
        self.record(Event::Release);
        if self.state.lock().failures.release {
            return Err(TransactionError::ReleaseFailed {
                reason: "mock release failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn fetch(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<ResultSet> {
        let mut state = self.state.lock();
        state.events.push(Event::Fetch(sql.to_string()));
        state.params.push(params.to_vec());

        if sql.starts_with("SELECT COUNT(*) AS cc") {
            let count = state.table.len() as u64;
            return Ok(ResultSet::new(
                vec!["cc".to_string()],
                vec![vec![Value::from(count)]],
            ));
        }

        let rows = state.table.rows();
        let page = match limit_offset(sql) {
            Some((limit, offset)) => rows.iter().skip(offset).take(limit).cloned().collect(),
            None => rows.to_vec(),
        };
        Ok(ResultSet::new(state.table.fields().to_vec(), page))
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> QueryResult<u64> {
        let mut state = self.state.lock();
        state.events.push(Event::Execute(sql.to_string()));
        state.params.push(params.to_vec());
        if let Some(marker) = &state.failures.execute_containing {
            if sql.contains(marker.as_str()) {
                return Err(mock_error(&format!("cannot execute: {}", sql)));
            }
        }
        Ok(1)
    }
}
