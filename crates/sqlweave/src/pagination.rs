//! Two-phase paginated queries.
//!
//! A pagination call first counts the rows the built query matches
//!
//! ```sql
//! SELECT COUNT(*) AS cc FROM (<built sql>) AS subquery
//! ```
//!
//! and only when the count is positive and the requested page starts inside
//! it, fetches the page with the driver's `LIMIT`/`OFFSET` fragment. Both
//! statements bind the same parameters.
//!
//! Two flavours compute "more pages exist" differently and are kept apart:
//!
//! - [`Paginator::paginate`]: `offset + page_size < count`
//! - [`Paginator::quick_search`]: `rows returned < count`. This only notices
//!   that the current fetch came back short of the total; it is also true on
//!   the last page of a multi-page result.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::driver::{Connection, Driver};
use crate::error::{QueryError, QueryResult};
use crate::materialize::Materializer;
use crate::predicate::{self, DynamicQuery, SearchCriteria};
use crate::transaction::TransactionCoordinator;
use crate::types::{PageRequest, PaginationResult, SqlParam, page_count};

/// Alias of the count column in the count query.
pub const COUNT_ALIAS: &str = "cc";

/// Wraps a query in the count statement.
pub fn count_sql(sql: &str) -> String {
    format!(
        "SELECT COUNT(*) AS {} FROM ({}) AS subquery",
        COUNT_ALIAS, sql
    )
}

/// Executes criteria and raw queries page by page.
#[derive(Debug)]
pub struct Paginator<D> {
    coordinator: TransactionCoordinator<D>,
    materializer: Materializer,
}

impl<D: Driver> Paginator<D> {
    /// Creates a paginator over a driver.
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(driver),
            materializer: Materializer::new(),
        }
    }

    /// Uses a materializer with column overrides.
    pub fn with_materializer(mut self, materializer: Materializer) -> Self {
        self.materializer = materializer;
        self
    }

    /// Creates criteria using the driver's placeholder syntax.
    pub fn criteria(&self, sql: impl Into<String>) -> SearchCriteria {
        SearchCriteria::new(sql).with_placeholder(self.driver().placeholder())
    }

    fn driver(&self) -> &D {
        self.coordinator.driver()
    }

    /// Runs one page of `query` on a connection of its own.
    pub async fn paginate<T, Q>(&self, query: &Q) -> QueryResult<PaginationResult<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
    {
        self.paginate_with(query, |_: &mut T| {}).await
    }

    /// Like [`paginate`](Self::paginate), running `hook` on each object.
    pub async fn paginate_with<T, Q, H>(
        &self,
        query: &Q,
        hook: H,
    ) -> QueryResult<PaginationResult<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
        H: FnMut(&mut T),
    {
        self.coordinator
            .with_connection(async move |conn| self.paginate_on(conn, query, hook).await)
            .await
    }

    /// Runs one page of `query` on the given connection.
    ///
    /// Use this inside [`TransactionCoordinator::transactional`] to paginate
    /// within a transaction.
    pub async fn paginate_on<T, Q, H>(
        &self,
        conn: &mut D::Connection,
        query: &Q,
        hook: H,
    ) -> QueryResult<PaginationResult<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
        H: FnMut(&mut T),
    {
        let built = predicate::build(query);
        self.check_placeholder(&built)?;
        let page = built.page();
        check_page_size(page.size)?;

        let (count, list) = self
            .two_phase(conn, built.sql(), built.order_by(), built.params(), page, hook)
            .await?;

        let has_more = page.offset().saturating_add(page.size) < count;
        Ok(PaginationResult::new(
            count,
            list,
            has_more,
            page_count(count, page.size),
        ))
    }

    /// Paginates a raw SQL body without criteria.
    pub async fn quick_search<T>(
        &self,
        sql: &str,
        params: &[SqlParam],
        page_number: u64,
        page_size: u64,
    ) -> QueryResult<PaginationResult<T>>
    where
        T: DeserializeOwned,
    {
        self.coordinator
            .with_connection(async |conn| {
                self.quick_search_on(conn, sql, params, page_number, page_size)
                    .await
            })
            .await
    }

    /// Paginates a raw SQL body on the given connection.
    pub async fn quick_search_on<T>(
        &self,
        conn: &mut D::Connection,
        sql: &str,
        params: &[SqlParam],
        page_number: u64,
        page_size: u64,
    ) -> QueryResult<PaginationResult<T>>
    where
        T: DeserializeOwned,
    {
        check_page_size(page_size)?;
        let page = PageRequest::new(page_number, page_size);

        let (count, list) = self
            .two_phase(conn, sql, "", params, page, |_: &mut T| {})
            .await?;

        let has_more = (list.len() as u64) < count;
        Ok(PaginationResult::new(
            count,
            list,
            has_more,
            page_count(count, page_size),
        ))
    }

    /// Fetches every row `query` matches, without paging.
    pub async fn fetch_all<T, Q>(&self, query: &Q) -> QueryResult<Vec<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
    {
        self.coordinator
            .with_connection(async |conn| self.fetch_all_on(conn, query).await)
            .await
    }

    /// Fetches every row `query` matches on the given connection.
    pub async fn fetch_all_on<T, Q>(&self, conn: &mut D::Connection, query: &Q) -> QueryResult<Vec<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
    {
        let built = predicate::build(query);
        self.check_placeholder(&built)?;
        let sql = compose(&[built.sql(), built.order_by()]);
        debug!(sql = %sql, params = %params_json(built.params()), "Fetching rows");
        let rows = conn.fetch(&sql, built.params()).await?;
        Ok(self.materializer.materialize(rows)?)
    }

    /// Fetches the first row `query` matches.
    pub async fn fetch_one<T, Q>(&self, query: &Q) -> QueryResult<Option<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
    {
        self.coordinator
            .with_connection(async |conn| self.fetch_one_on(conn, query).await)
            .await
    }

    /// Fetches the first row `query` matches on the given connection.
    pub async fn fetch_one_on<T, Q>(&self, conn: &mut D::Connection, query: &Q) -> QueryResult<Option<T>>
    where
        T: DeserializeOwned,
        Q: DynamicQuery + ?Sized,
    {
        let built = predicate::build(query);
        self.check_placeholder(&built)?;
        let limit = self.driver().limit_offset(1, 0);
        let sql = compose(&[built.sql(), built.order_by(), &limit]);
        debug!(sql = %sql, params = %params_json(built.params()), "Fetching first row");
        let rows = conn.fetch(&sql, built.params()).await?;
        Ok(self.materializer.materialize(rows)?.into_iter().next())
    }

    async fn two_phase<T, H>(
        &self,
        conn: &mut D::Connection,
        sql: &str,
        order_by: &str,
        params: &[SqlParam],
        page: PageRequest,
        hook: H,
    ) -> QueryResult<(u64, Vec<T>)>
    where
        T: DeserializeOwned,
        H: FnMut(&mut T),
    {
        let count_sql = count_sql(sql);
        debug!(sql = %count_sql, params = %params_json(params), "Counting rows");
        let count = conn
            .fetch_one(&count_sql, params)
            .await?
            .as_ref()
            .and_then(|row| row.get(COUNT_ALIAS))
            .map(count_value)
            .unwrap_or(0);

        if count == 0 {
            return Ok((0, Vec::new()));
        }

        let offset = page.offset();
        if offset >= count {
            debug!(offset, count, "Requested page starts past the last row");
            return Ok((count, Vec::new()));
        }

        let limit = self.driver().limit_offset(page.size, offset);
        let fetch_sql = compose(&[sql, order_by, &limit]);
        debug!(sql = %fetch_sql, params = %params_json(params), "Fetching page");
        let rows = conn.fetch(&fetch_sql, params).await?;
        let list = self.materializer.materialize_with(rows, hook)?;
        Ok((count, list))
    }

    fn check_placeholder(&self, built: &SearchCriteria) -> QueryResult<()> {
        let expected = self.driver().placeholder();
        if !built.params().is_empty() && built.placeholder() != expected {
            return Err(QueryError::invalid_input(format!(
                "criteria uses {:?} placeholders but {} binds {:?}",
                built.placeholder(),
                self.driver().name(),
                expected
            )));
        }
        Ok(())
    }
}

/// Largest page size a `LIMIT` clause accepts.
pub const MAX_PAGE_SIZE: u64 = i64::MAX as u64;

fn check_page_size(size: u64) -> QueryResult<()> {
    if size == 0 {
        return Err(QueryError::invalid_input("page size must be positive"));
    }
    if size > MAX_PAGE_SIZE {
        return Err(QueryError::invalid_input(format!(
            "page size {} exceeds the maximum of {}",
            size, MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

/// Bound parameters rendered for logs.
fn params_json(params: &[SqlParam]) -> Value {
    Value::Array(params.iter().map(SqlParam::to_json).collect())
}

/// Reads the count column, treating anything unreadable as zero.
fn count_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn compose(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
