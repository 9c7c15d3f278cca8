//! Response types for handlers
//!
//! Transport-neutral wrappers: they derive `Serialize` and leave framing to
//! whatever boundary sits above the handlers.
//!
//! # Example
//!
//! ```rust
//! use entity_repo::handlers::{ListResponse, PaginationMeta};
//! use entity_repo::repository::PagedResult;
//!
//! let page = PagedResult::new(vec!["Ada", "Grace"], 5);
//! let response = ListResponse::from_page(page, 1, 2);
//! assert_eq!(response.data.len(), 2);
//! assert_eq!(response.pagination.total_pages, 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::repository::PagedResult;

/// Pagination metadata for list responses
///
/// ```rust
/// use entity_repo::handlers::PaginationMeta;
///
/// let pagination = PaginationMeta::new(2, 20, 50);
/// assert_eq!(pagination.total_pages, 3);
/// assert!(pagination.has_next);
/// assert!(pagination.has_prev);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total: u64,
    /// Total number of pages
    pub total_pages: u32,
    /// Whether there is a next page
    pub has_next: bool,
    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create new pagination metadata
    ///
    /// Derives `total_pages`, `has_next` and `has_prev`. A `per_page` of zero
    /// is treated as one.
    #[must_use]
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = calculate_total_pages(total, per_page);

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Number of items before this page
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// Calculate total pages, rounding up
fn calculate_total_pages(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page);
    let pages = total.div_ceil(per_page);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// List response with pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// The list of items
    pub data: Vec<T>,
    /// Pagination metadata
    pub pagination: PaginationMeta,
}

impl<T> ListResponse<T> {
    /// Create a new list response
    pub fn new(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self { data, pagination }
    }

    /// Wrap one page of a repository read
    ///
    /// The page's `total_count` becomes `pagination.total`.
    pub fn from_page(page: PagedResult<T>, page_number: u32, per_page: u32) -> Self {
        let pagination = PaginationMeta::new(page_number, per_page, page.total_count);
        Self::new(page.items, pagination)
    }

    /// Map each item in the list to a new type
    pub fn map<U, F>(self, f: F) -> ListResponse<U>
    where
        F: FnMut(T) -> U,
    {
        ListResponse {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
