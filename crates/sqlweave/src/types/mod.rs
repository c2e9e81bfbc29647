//! Core value types shared by every component.
//!
//! - [`SqlParam`] and [`Placeholder`] describe bound parameters
//! - [`ResultSet`] carries rows returned by a driver
//! - [`PageRequest`] and [`PaginationResult`] describe paging

mod page;
mod param;
mod result_set;

pub use page::{DEFAULT_PAGE_SIZE, PageRequest, PaginationResult, page_count};
pub use param::{Placeholder, SqlParam};
pub use result_set::{ResultSet, Row};
