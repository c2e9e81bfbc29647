//! Page requests and pagination results.
//!
//! Page numbers are 1-based. The page count and the "more pages" flag are
//! derived from the total count rather than stored by the caller.

use serde::{Deserialize, Serialize};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u64 = 25;

/// The page a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number. Values below 1 are treated as 1.
    pub number: u64,

    /// Maximum number of rows on the page. Must be positive.
    pub size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(number: u64, size: u64) -> Self {
        Self { number, size }
    }

    /// Sets the page number.
    pub fn with_number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    /// Sets the page size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Returns the row offset of the first row on this page.
    pub fn offset(&self) -> u64 {
        (self.number.max(1) - 1).saturating_mul(self.size)
    }
}

/// Number of pages needed for `count` rows at `size` rows per page.
///
/// `size` must be positive.
pub fn page_count(count: u64, size: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (count - 1) / size + 1
    }
}

/// The outcome of one pagination call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult<T> {
    count: u64,
    list: Vec<T>,
    has_more: bool,
    pages: u64,
}

impl<T> PaginationResult<T> {
    pub(crate) fn new(count: u64, list: Vec<T>, has_more: bool, pages: u64) -> Self {
        Self {
            count,
            list,
            has_more,
            pages,
        }
    }

    /// The result of a query that matched nothing.
    pub fn empty() -> Self {
        Self::new(0, Vec::new(), false, 0)
    }

    /// Total number of matching rows.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rows on the current page.
    pub fn list(&self) -> &[T] {
        &self.list
    }

    /// Whether more pages exist.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Total number of pages.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// Consumes the result, returning the rows.
    pub fn into_list(self) -> Vec<T> {
        self.list
    }
}
