//! Declarative read descriptions
//!
//! A [`QuerySpec`] bundles everything a read needs: filter, ordering,
//! includes, pagination and a projection. It is built per call, never
//! mutated after being handed to a repository, and never executed by itself.
//!
//! Within one read the stages always run in this order:
//! filter, order, paginate, include, project.
//!
//! # Example
//!
//! ```rust
//! use entity_repo::repository::{Filter, OrderBy, Projection, QuerySpec};
//!
//! #[derive(Debug, Clone)]
//! struct Person { id: i64, name: String }
//!
//! let spec = QuerySpec::<Person>::new()
//!     .with_filter(Filter::ne("name", "B"))
//!     .with_order_by(OrderBy::desc("id"))
//!     .skip(0)
//!     .take(1)
//!     .select(Projection::new("name", |p: Person| p.name));
//!
//! assert_eq!(spec.pagination().take, Some(1));
//! assert_eq!(spec.projection().name(), "name");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::RepositoryOperation;
use super::filter::Filter;
use super::include::{Include, Relation};
use super::pagination::{OrderBy, Pagination};
use super::traits::RepositoryResult;

/// Named mapping from an entity to the shape a caller wants back
///
/// Projections run in memory after the page has been loaded, so they may
/// use any Rust code, but they must be pure.
pub struct Projection<T, R> {
    name: Cow<'static, str>,
    map: Arc<dyn Fn(T) -> R + Send + Sync>,
}

impl<T: 'static, R: 'static> Projection<T, R> {
    /// Create a projection
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        map: impl Fn(T) -> R + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            map: Arc::new(map),
        }
    }
}

impl<T, R> Projection<T, R> {
    /// Name used in logs and debug output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Project one entity
    pub fn apply(&self, entity: T) -> R {
        (self.map)(entity)
    }
}

impl<T: 'static> Projection<T, T> {
    /// The projection that returns entities unchanged
    pub fn identity() -> Self {
        Self::new("identity", |entity| entity)
    }
}

impl<T, R> Clone for Projection<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            map: Arc::clone(&self.map),
        }
    }
}

impl<T, R> fmt::Debug for Projection<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Projection").field(&self.name).finish()
    }
}

/// One page of projected results plus the size of the filtered set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<R> {
    /// The page, after projection
    pub items: Vec<R>,
    /// Entities matching the filter, before pagination
    pub total_count: u64,
}

impl<R> PagedResult<R> {
    /// Create a paged result
    pub fn new(items: Vec<R>, total_count: u64) -> Self {
        Self { items, total_count }
    }

    /// Map every item, keeping the total count
    pub fn map<U, F>(self, f: F) -> PagedResult<U>
    where
        F: FnMut(R) -> U,
    {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }

    /// Number of items in this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Declarative description of a read over entity `T`, projected to `R`
pub struct QuerySpec<T, R = T> {
    filter: Option<Filter>,
    order_by: Option<OrderBy>,
    include: Include<T>,
    pagination: Pagination,
    projection: Projection<T, R>,
}

impl<T: Send + 'static> QuerySpec<T> {
    /// Everything, unordered, unprojected
    pub fn new() -> Self {
        Self {
            filter: None,
            order_by: None,
            include: Include::none(),
            pagination: Pagination::none(),
            projection: Projection::identity(),
        }
    }
}

impl<T: Send + 'static> Default for QuerySpec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static, R: 'static> QuerySpec<T, R> {
    /// Replace the filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Narrow the filter, keeping any existing one
    #[must_use]
    pub fn and_filter(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Replace the ordering
    #[must_use]
    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Also load `relation` for each returned entity
    #[must_use]
    pub fn with_include<Rel: Relation<T>>(mut self, relation: Rel) -> Self {
        self.include = self.include.and(relation);
        self
    }

    /// Also load every relation of `include`
    #[must_use]
    pub fn with_includes(mut self, include: Include<T>) -> Self {
        self.include = self.include.extend(include);
        self
    }

    /// Replace the pagination
    #[must_use]
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Skip the first `n` results
    #[must_use]
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination.skip = Some(n);
        self
    }

    /// Return at most `n` results
    #[must_use]
    pub fn take(mut self, n: u64) -> Self {
        self.pagination.take = Some(n);
        self
    }

    /// Set pagination from `-1 = unset` integers
    ///
    /// `operation` is the read the query is built for; a rejected value is
    /// reported against it.
    pub fn with_sentinels(
        self,
        operation: RepositoryOperation,
        skip: i64,
        take: i64,
    ) -> RepositoryResult<Self> {
        Ok(self.with_pagination(Pagination::from_sentinels(operation, skip, take)?))
    }

    /// Replace the projection
    pub fn select<R2: 'static>(self, projection: Projection<T, R2>) -> QuerySpec<T, R2> {
        QuerySpec {
            filter: self.filter,
            order_by: self.order_by,
            include: self.include,
            pagination: self.pagination,
            projection,
        }
    }
}

impl<T, R> QuerySpec<T, R> {
    /// The filter, if any
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// The ordering, if any
    pub fn order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Relations to load
    pub fn include(&self) -> &Include<T> {
        &self.include
    }

    /// The pagination bounds
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// The projection
    pub fn projection(&self) -> &Projection<T, R> {
        &self.projection
    }
}

impl<T, R> Clone for QuerySpec<T, R> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            include: self.include.clone(),
            pagination: self.pagination,
            projection: self.projection.clone(),
        }
    }
}

impl<T, R> fmt::Debug for QuerySpec<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("filter", &self.filter)
            .field("order_by", &self.order_by)
            .field("include", &self.include)
            .field("pagination", &self.pagination)
            .field("projection", &self.projection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{PageWindow, RepositoryErrorKind};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        name: String,
    }

    #[test]
    fn test_defaults() {
        let spec = QuerySpec::<Item>::new();
        assert!(spec.filter().is_none());
        assert!(spec.order_by().is_none());
        assert!(spec.include().is_empty());
        assert_eq!(spec.pagination().window(), PageWindow::Full);
        assert_eq!(spec.projection().name(), "identity");
    }

    #[test]
    fn test_identity_projection_returns_input() {
        let item = Item {
            id: 1,
            name: "a".into(),
        };
        assert_eq!(Projection::identity().apply(item.clone()), item);
    }

    #[test]
    fn test_and_filter_combines() {
        let spec = QuerySpec::<Item>::new()
            .and_filter(Filter::gt("id", 1))
            .and_filter(Filter::ne("name", "B"));
        assert_eq!(
            spec.filter(),
            Some(&Filter::gt("id", 1).and(Filter::ne("name", "B")))
        );
    }

    #[test]
    fn test_select_keeps_other_parts() {
        let spec = QuerySpec::<Item>::new()
            .with_filter(Filter::eq("id", 3))
            .with_order_by(OrderBy::asc("name"))
            .take(5)
            .select(Projection::new("id-only", |i: Item| i.id));

        assert_eq!(spec.filter(), Some(&Filter::eq("id", 3)));
        assert_eq!(spec.order_by(), Some(&OrderBy::asc("name")));
        assert_eq!(spec.pagination().window(), PageWindow::Take(5));
        assert_eq!(
            spec.projection().apply(Item {
                id: 3,
                name: "c".into()
            }),
            3
        );
    }

    #[test]
    fn test_with_sentinels() {
        let spec = QuerySpec::<Item>::new()
            .with_sentinels(RepositoryOperation::Get, 2, -1)
            .unwrap();
        assert_eq!(spec.pagination().window(), PageWindow::Skip(2));

        let err = QuerySpec::<Item>::new()
            .with_sentinels(RepositoryOperation::Count, -3, -1)
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(err.operation, RepositoryOperation::Count);
    }

    #[test]
    fn test_paged_result_map_keeps_total() {
        let page = PagedResult::new(vec![1, 2], 10).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total_count, 10);
        assert_eq!(page.len(), 2);
    }
}
