//! Ordering and pagination for repository queries
//!
//! [`Pagination`] carries the paging policy: `skip` and `take` are each
//! optional, giving four windows over an (ordered) result set. Callers that
//! speak the `-1 = unset` convention go through [`Pagination::from_sentinels`].
//!
//! # Example
//!
//! ```rust
//! use entity_repo::repository::{OrderBy, PageWindow, Pagination, RepositoryOperation};
//!
//! let order = OrderBy::desc("id").then_asc("name");
//! assert_eq!(order.keys().len(), 2);
//!
//! let window = Pagination::from_sentinels(RepositoryOperation::Get, -1, 10).unwrap();
//! assert_eq!(window.window(), PageWindow::Take(10));
//! assert_eq!(window.apply(1..=100), (1..=10).collect::<Vec<_>>());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;

/// Direction for ordering results
///
/// # Example
///
/// ```rust
/// use entity_repo::repository::OrderDirection;
///
/// assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
/// assert_eq!(OrderDirection::Descending.as_sql(), "DESC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    #[serde(rename = "desc")]
    Descending,
}

impl OrderDirection {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    /// Field to sort on
    pub field: String,
    /// Sort direction
    #[serde(default)]
    pub direction: OrderDirection,
}

/// Ordered list of sort keys, most significant first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBy {
    keys: Vec<OrderKey>,
}

impl OrderBy {
    /// Order by a single field in the given direction
    pub fn by(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            keys: vec![OrderKey {
                field: field.into(),
                direction,
            }],
        }
    }

    /// Order ascending by `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self::by(field, OrderDirection::Ascending)
    }

    /// Order descending by `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self::by(field, OrderDirection::Descending)
    }

    /// Add a tie-breaking key
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.keys.push(OrderKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Add an ascending tie-breaking key
    #[must_use]
    pub fn then_asc(self, field: impl Into<String>) -> Self {
        self.then(field, OrderDirection::Ascending)
    }

    /// Add a descending tie-breaking key
    #[must_use]
    pub fn then_desc(self, field: impl Into<String>) -> Self {
        self.then(field, OrderDirection::Descending)
    }

    /// The sort keys, most significant first
    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    pub(crate) fn validate(
        &self,
        operation: RepositoryOperation,
        entity: &str,
        is_column: impl Fn(&str) -> bool,
    ) -> RepositoryResult<()> {
        if self.keys.is_empty() {
            return Err(RepositoryError::invalid_argument(
                operation,
                "order_by requires at least one key",
            ));
        }
        match self.keys.iter().find(|key| !is_column(key.field.as_str())) {
            Some(key) => Err(RepositoryError::invalid_argument(
                operation,
                format!("unknown field '{}' in order_by", key.field),
            )
            .with_entity_type(entity)),
            None => Ok(()),
        }
    }
}

/// The four paging windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWindow {
    /// No paging: the whole result set
    Full,
    /// Drop the first N results
    Skip(u64),
    /// Keep the first N results
    Take(u64),
    /// Drop `skip` results, then keep `take`
    SkipTake {
        /// Results to drop
        skip: u64,
        /// Results to keep
        take: u64,
    },
}

/// Pagination parameters for limiting query results
///
/// # Example
///
/// ```rust
/// use entity_repo::repository::Pagination;
///
/// // Page 3 with 20 items per page
/// let page3 = Pagination::page(3, 20);
/// assert_eq!(page3.skip, Some(40));
/// assert_eq!(page3.take, Some(20));
///
/// // Unbounded
/// assert!(!Pagination::none().is_applied());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of results to skip
    #[serde(default)]
    pub skip: Option<u64>,
    /// Maximum number of results to return
    #[serde(default)]
    pub take: Option<u64>,
}

impl Pagination {
    /// Sentinel meaning "not set" for callers that pass plain integers
    pub const UNSET: i64 = -1;

    /// No paging
    #[must_use]
    pub const fn none() -> Self {
        Self {
            skip: None,
            take: None,
        }
    }

    /// Create pagination parameters from optional bounds
    #[must_use]
    pub const fn new(skip: Option<u64>, take: Option<u64>) -> Self {
        Self { skip, take }
    }

    /// Skip `skip` results, then take `take`
    #[must_use]
    pub const fn skip_take(skip: u64, take: u64) -> Self {
        Self::new(Some(skip), Some(take))
    }

    /// Skip `n` results, return the rest
    #[must_use]
    pub const fn skip_only(n: u64) -> Self {
        Self::new(Some(n), None)
    }

    /// Return at most `n` results
    #[must_use]
    pub const fn take_only(n: u64) -> Self {
        Self::new(None, Some(n))
    }

    /// Create pagination for the first page with the given limit
    #[must_use]
    pub const fn first_page(limit: u64) -> Self {
        Self::skip_take(0, limit)
    }

    /// Create pagination for a specific page number (1-indexed)
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let skip = page_number.saturating_sub(1).saturating_mul(page_size);
        Self::skip_take(skip, page_size)
    }

    /// Build from `-1 = unset` integers for the read `operation` will run
    ///
    /// Any other negative value is rejected with an error tagged `operation`.
    ///
    /// ```rust
    /// use entity_repo::repository::{PageWindow, Pagination, RepositoryOperation};
    ///
    /// let op = RepositoryOperation::Get;
    /// assert_eq!(Pagination::from_sentinels(op, -1, -1).unwrap().window(), PageWindow::Full);
    /// assert_eq!(Pagination::from_sentinels(op, 5, -1).unwrap().window(), PageWindow::Skip(5));
    /// assert!(Pagination::from_sentinels(op, -2, 10).is_err());
    /// ```
    pub fn from_sentinels(
        operation: RepositoryOperation,
        skip: i64,
        take: i64,
    ) -> RepositoryResult<Self> {
        Ok(Self::new(
            sentinel(operation, "skip", skip)?,
            sentinel(operation, "take", take)?,
        ))
    }

    /// Which of the four windows these bounds describe
    pub const fn window(&self) -> PageWindow {
        match (self.skip, self.take) {
            (None, None) => PageWindow::Full,
            (Some(skip), None) => PageWindow::Skip(skip),
            (None, Some(take)) => PageWindow::Take(take),
            (Some(skip), Some(take)) => PageWindow::SkipTake { skip, take },
        }
    }

    /// Whether any bound is set
    pub const fn is_applied(&self) -> bool {
        self.skip.is_some() || self.take.is_some()
    }

    /// Apply the window to an already ordered sequence
    ///
    /// The store applies the same rule with `LIMIT`/`OFFSET`; this is the
    /// in-memory form used for post-filtering and as a reference in tests.
    pub fn apply<I: IntoIterator>(&self, items: I) -> Vec<I::Item> {
        let skip = self.skip.map_or(0, saturating_usize);
        let iter = items.into_iter().skip(skip);
        match self.take {
            Some(take) => iter.take(saturating_usize(take)).collect(),
            None => iter.collect(),
        }
    }
}

fn sentinel(
    operation: RepositoryOperation,
    name: &str,
    raw: i64,
) -> RepositoryResult<Option<u64>> {
    match raw {
        Pagination::UNSET => Ok(None),
        n if n >= 0 => Ok(Some(n.unsigned_abs())),
        n => Err(RepositoryError::invalid_argument(
            operation,
            format!("{} must be -1 (unset) or non-negative, got {}", name, n),
        )),
    }
}

fn saturating_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;

    #[test]
    fn test_order_direction_display() {
        assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
        assert_eq!(format!("{}", OrderDirection::Descending), "desc");
        assert_eq!(OrderDirection::default(), OrderDirection::Ascending);
    }

    #[test]
    fn test_order_by_builder() {
        let order = OrderBy::asc("last_name").then_desc("id");
        let keys = order.keys();
        assert_eq!(keys[0].field, "last_name");
        assert_eq!(keys[0].direction, OrderDirection::Ascending);
        assert_eq!(keys[1].field, "id");
        assert_eq!(keys[1].direction, OrderDirection::Descending);
    }

    #[test]
    fn test_order_by_validation() {
        let order = OrderBy::asc("id").then_asc("email");
        let err = order
            .validate(RepositoryOperation::Get, "User", |f| f == "id")
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        assert!(err.message.contains("email"));
    }

    #[test]
    fn test_order_by_serde() {
        let json = serde_json::to_string(&OrderBy::desc("id")).unwrap();
        assert_eq!(json, r#"[{"field":"id","direction":"desc"}]"#);
    }

    #[test]
    fn test_sentinel_grid() {
        for skip in [-1_i64, 0, 1, 7] {
            for take in [-1_i64, 0, 1, 7] {
                let pagination =
                    Pagination::from_sentinels(RepositoryOperation::Get, skip, take).unwrap();
                let expected = match (skip, take) {
                    (-1, -1) => PageWindow::Full,
                    (s, -1) => PageWindow::Skip(s as u64),
                    (-1, t) => PageWindow::Take(t as u64),
                    (s, t) => PageWindow::SkipTake {
                        skip: s as u64,
                        take: t as u64,
                    },
                };
                assert_eq!(pagination.window(), expected, "skip={skip} take={take}");
            }
        }
    }

    #[test]
    fn test_sentinel_rejects_other_negatives() {
        let err = Pagination::from_sentinels(RepositoryOperation::GetProjected, 0, -5).unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(err.operation, RepositoryOperation::GetProjected);
        assert!(err.message.contains("take"));

        let err = Pagination::from_sentinels(RepositoryOperation::Query, i64::MIN, -1).unwrap_err();
        assert_eq!(err.operation, RepositoryOperation::Query);
        assert!(err.message.contains("skip"));
    }

    #[test]
    fn test_apply_matches_skip_take_semantics() {
        let items: Vec<u32> = (1..=5).collect();
        assert_eq!(Pagination::none().apply(items.clone()), items);
        assert_eq!(Pagination::skip_only(3).apply(items.clone()), vec![4, 5]);
        assert_eq!(Pagination::take_only(2).apply(items.clone()), vec![1, 2]);
        assert_eq!(Pagination::skip_take(1, 2).apply(items.clone()), vec![2, 3]);
        assert_eq!(Pagination::skip_take(10, 2).apply(items.clone()), Vec::<u32>::new());
        assert_eq!(Pagination::take_only(0).apply(items), Vec::<u32>::new());
    }

    #[test]
    fn test_page_helpers() {
        assert_eq!(Pagination::page(1, 20), Pagination::skip_take(0, 20));
        assert_eq!(Pagination::page(0, 20), Pagination::skip_take(0, 20));
        assert_eq!(Pagination::first_page(5).take, Some(5));
        assert_eq!(Pagination::page(u64::MAX, 2).skip, Some(u64::MAX));
    }
}
