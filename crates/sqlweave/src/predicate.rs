//! Dynamic WHERE-clause accumulation.
//!
//! A [`SearchCriteria`] owns a base SQL fragment plus the parameters bound to
//! it. Each builder call appends one clause and pushes its values in the same
//! step, so the Nth parameter always belongs to the Nth placeholder. Empty
//! values (null, blank text) produce no clause at all.
//!
//! ```
//! use sqlweave::predicate::SearchCriteria;
//!
//! let mut criteria = SearchCriteria::new("SELECT * FROM users WHERE 1=1");
//! criteria.add_equal("active", "status");
//! criteria.add_equal(None::<&str>, "team");
//! criteria.add_like("jo*", "name");
//!
//! assert_eq!(
//!     criteria.sql(),
//!     "SELECT * FROM users WHERE 1=1 AND status = $1 AND name LIKE $2 ESCAPE '\\'"
//! );
//! assert_eq!(criteria.params().len(), 2);
//! ```

use crate::types::{PageRequest, Placeholder, SqlParam};

/// Marker callers use for "any characters" in wildcard searches.
pub const WILDCARD: char = '*';

/// Wildcard understood by SQL `LIKE`.
const LIKE_WILDCARD: char = '%';

/// Mutable accumulator for a dynamically built query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    sql: String,
    order_by: String,
    params: Vec<SqlParam>,
    page: PageRequest,
    placeholder: Placeholder,
}

impl SearchCriteria {
    /// Creates criteria over a base query.
    ///
    /// Clauses are appended as `AND ...`, so the base query should already
    /// end in a `WHERE` condition (`WHERE 1=1` when there is none).
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    /// Binds parameters the base query already references.
    pub fn bind<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = SqlParam>,
    {
        self.params.extend(params);
        self
    }

    /// Sets the ordering fragment, e.g. `ORDER BY created_at DESC`.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Sets the requested page.
    pub fn with_page(mut self, number: u64, size: u64) -> Self {
        self.page = PageRequest::new(number, size);
        self
    }

    /// Sets the placeholder syntax. Must be chosen before any clause is added.
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Replaces the ordering fragment.
    pub fn set_order_by(&mut self, order_by: impl Into<String>) {
        self.order_by = order_by.into();
    }

    /// Replaces the requested page.
    pub fn set_page(&mut self, page: PageRequest) {
        self.page = page;
    }

    /// The accumulated SQL.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The ordering fragment.
    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// The bound parameters, in placeholder order.
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// The requested page.
    pub fn page(&self) -> PageRequest {
        self.page
    }

    /// The placeholder syntax.
    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Index the next pushed parameter will take.
    pub fn next_index(&self) -> usize {
        self.params.len() + 1
    }

    /// Placeholder text for the next pushed parameter.
    pub fn next_placeholder(&self) -> String {
        self.placeholder.render(self.next_index())
    }

    /// Appends `AND column = ?` when `value` is non-empty.
    ///
    /// Returns the next free parameter index.
    pub fn add_equal(&mut self, value: impl Into<SqlParam>, column: &str) -> usize {
        let value = value.into();
        if !value.is_empty() {
            self.push_comparison(column, "=", value);
        }
        self.next_index()
    }

    /// Appends a `LIKE` clause when `text` contains the `*` wildcard.
    ///
    /// Literal `%` in the text is escaped first, then every `*` becomes `%`.
    /// Text without `*` falls back to [`add_equal`](Self::add_equal).
    pub fn add_like(&mut self, text: impl Into<SqlParam>, column: &str) -> usize {
        let value = text.into();
        match value.as_text() {
            Some(text) if !value.is_empty() && text.contains(WILDCARD) => {
                let pattern = like_pattern(text);
                let clause = format!(
                    " AND {} LIKE {} ESCAPE '\\'",
                    column,
                    self.next_placeholder()
                );
                self.push_clause(&clause, SqlParam::Text(pattern));
                self.next_index()
            }
            _ => self.add_equal(value, column),
        }
    }

    /// Appends `column >= from` and/or `column < to`.
    ///
    /// Each bound is optional on its own. The upper bound is exclusive.
    pub fn add_range(
        &mut self,
        from: impl Into<SqlParam>,
        to: impl Into<SqlParam>,
        column: &str,
    ) -> usize {
        let from = from.into();
        let to = to.into();
        if !from.is_empty() {
            self.push_comparison(column, ">=", from);
        }
        if !to.is_empty() {
            self.push_comparison(column, "<", to);
        }
        self.next_index()
    }

    /// Appends `column IN (...)` over the non-empty values.
    pub fn add_in<I, V>(&mut self, values: I, column: &str) -> usize
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlParam>,
    {
        let values: Vec<SqlParam> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            return self.next_index();
        }

        let first = self.next_index();
        let placeholders: Vec<String> = (first..first + values.len())
            .map(|i| self.placeholder.render(i))
            .collect();
        self.sql
            .push_str(&format!(" AND {} IN ({})", column, placeholders.join(", ")));
        self.params.extend(values);
        self.next_index()
    }

    /// Appends a hand-written fragment with its parameters.
    ///
    /// The fragment must reference the parameters with placeholders starting
    /// at [`next_index`](Self::next_index); see
    /// [`next_placeholder`](Self::next_placeholder).
    pub fn add_clause<I>(&mut self, fragment: &str, params: I) -> usize
    where
        I: IntoIterator<Item = SqlParam>,
    {
        if !fragment.starts_with(' ') {
            self.sql.push(' ');
        }
        self.sql.push_str(fragment);
        self.params.extend(params);
        self.next_index()
    }

    fn push_comparison(&mut self, column: &str, op: &str, value: SqlParam) {
        let clause = format!(" AND {} {} {}", column, op, self.next_placeholder());
        self.push_clause(&clause, value);
    }

    fn push_clause(&mut self, clause: &str, value: SqlParam) {
        self.sql.push_str(clause);
        self.params.push(value);
    }
}

/// Rewrites user wildcard text into a `LIKE` pattern.
///
/// Existing `%` are escaped before `*` is converted; the other order would
/// turn user-supplied percent signs into wildcards.
pub fn like_pattern(text: &str) -> String {
    text.replace(LIKE_WILDCARD, "\\%")
        .replace(WILDCARD, &LIKE_WILDCARD.to_string())
}

/// A query whose clauses are added at execution time.
///
/// The pagination engine calls [`dynamic_query`](Self::dynamic_query) once
/// per call, on a copy of [`criteria`](Self::criteria), so the same query can
/// be executed repeatedly with the same result.
pub trait DynamicQuery: Send + Sync {
    /// The base accumulator.
    fn criteria(&self) -> &SearchCriteria;

    /// Appends the clauses for the current filter values.
    fn dynamic_query(&self, _query: &mut SearchCriteria) {}
}

impl DynamicQuery for SearchCriteria {
    fn criteria(&self) -> &SearchCriteria {
        self
    }
}

/// Runs the hook of `query` and returns the built criteria.
pub(crate) fn build<Q: DynamicQuery + ?Sized>(query: &Q) -> SearchCriteria {
    let mut built = query.criteria().clone();
    query.dynamic_query(&mut built);
    built
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SearchCriteria {
        SearchCriteria::new("SELECT * FROM t WHERE 1=1")
    }

    #[test]
    fn test_equal_appends_clause_and_param() {
        let mut c = base();
        let next = c.add_equal("x", "col");
        assert_eq!(c.sql(), "SELECT * FROM t WHERE 1=1 AND col = $1");
        assert_eq!(c.params(), &[SqlParam::text("x")]);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_equal_skips_empty_values() {
        let mut c = base();
        c.add_equal("", "a");
        c.add_equal("  ", "b");
        c.add_equal(None::<i64>, "c");
        c.add_equal(SqlParam::Null, "d");
        assert_eq!(c.sql(), "SELECT * FROM t WHERE 1=1");
        assert!(c.params().is_empty());
    }

    #[test]
    fn test_zero_is_not_empty() {
        let mut c = base();
        c.add_equal(0i64, "n");
        assert_eq!(c.params(), &[SqlParam::Integer(0)]);
    }

    #[test]
    fn test_like_escapes_before_converting() {
        let mut c = base();
        c.add_like("100%*", "label");
        assert_eq!(
            c.sql(),
            "SELECT * FROM t WHERE 1=1 AND label LIKE $1 ESCAPE '\\'"
        );
        assert_eq!(c.params(), &[SqlParam::text("100\\%%")]);
    }

    #[test]
    fn test_like_without_marker_is_equality() {
        let mut c = base();
        c.add_like("50%", "label");
        assert_eq!(c.sql(), "SELECT * FROM t WHERE 1=1 AND label = $1");
        assert_eq!(c.params(), &[SqlParam::text("50%")]);
    }

    #[test]
    fn test_like_skips_empty() {
        let mut c = base();
        c.add_like("", "label");
        c.add_like(None::<&str>, "label");
        assert!(c.params().is_empty());
    }

    #[test]
    fn test_range_bounds_independent() {
        let mut c = base();
        c.add_range(10i64, None::<i64>, "age");
        c.add_range(None::<i64>, 20i64, "score");
        c.add_range(1i64, 5i64, "rank");
        assert_eq!(
            c.sql(),
            "SELECT * FROM t WHERE 1=1 AND age >= $1 AND score < $2 AND rank >= $3 AND rank < $4"
        );
        assert_eq!(c.params().len(), 4);
    }

    #[test]
    fn test_indices_follow_param_count() {
        let mut c = base();
        c.add_equal("a", "x");
        c.add_equal("", "skipped");
        c.add_in(["p", "", "q"], "y");
        let next = c.add_equal("b", "z");
        assert_eq!(
            c.sql(),
            "SELECT * FROM t WHERE 1=1 AND x = $1 AND y IN ($2, $3) AND z = $4"
        );
        assert_eq!(next, 5);
    }

    #[test]
    fn test_in_with_only_empty_values() {
        let mut c = base();
        c.add_in(Vec::<String>::new(), "y");
        c.add_in([""], "y");
        assert_eq!(c.sql(), "SELECT * FROM t WHERE 1=1");
    }

    #[test]
    fn test_question_placeholders() {
        let mut c = base().with_placeholder(Placeholder::Question);
        c.add_equal("a", "x");
        c.add_range("2024-01-01", "2025-01-01", "created");
        assert_eq!(
            c.sql(),
            "SELECT * FROM t WHERE 1=1 AND x = ?1 AND created >= ?2 AND created < ?3"
        );
    }

    #[test]
    fn test_add_clause() {
        let mut c = base();
        c.add_equal("a", "x");
        let fragment = format!("AND lower(name) = lower({})", c.next_placeholder());
        c.add_clause(&fragment, [SqlParam::text("Ann")]);
        assert_eq!(
            c.sql(),
            "SELECT * FROM t WHERE 1=1 AND x = $1 AND lower(name) = lower($2)"
        );
        assert_eq!(c.params().len(), 2);
    }

    struct ActiveUsers {
        base: SearchCriteria,
        team: Option<String>,
    }

    impl DynamicQuery for ActiveUsers {
        fn criteria(&self) -> &SearchCriteria {
            &self.base
        }

        fn dynamic_query(&self, query: &mut SearchCriteria) {
            query.add_equal(self.team.as_deref(), "team");
        }
    }

    #[test]
    fn test_build_runs_hook_on_a_copy() {
        let q = ActiveUsers {
            base: base(),
            team: Some("core".to_string()),
        };
        let first = build(&q);
        let second = build(&q);
        assert_eq!(first, second);
        assert_eq!(first.params().len(), 1);
        assert!(q.criteria().params().is_empty());
    }
}
