//! Composable queries returned by [`Repository::query`](super::Repository::query)
//!
//! A [`QueryHandle`] holds the session borrow and a [`QuerySpec`] that callers
//! keep refining; nothing touches the store until one of the terminal
//! methods runs.

use tokio_util::sync::CancellationToken;

use super::error::RepositoryOperation;
use super::executor;
use super::filter::Filter;
use super::include::Relation;
use super::pagination::{OrderBy, Pagination};
use super::query::{PagedResult, Projection, QuerySpec};
use super::session::{guard, settle, Session};
use super::sql;
use super::traits::{Entity, RepositoryResult};

/// A not-yet-executed query over entity `T`
pub struct QueryHandle<'r, T> {
    session: &'r mut Session,
    spec: QuerySpec<T>,
}

impl<'r, T: Entity> QueryHandle<'r, T> {
    pub(crate) fn new(session: &'r mut Session, spec: QuerySpec<T>) -> Self {
        Self { session, spec }
    }

    /// Narrow the filter
    #[must_use]
    pub fn and_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.spec = self.spec.and_filter(filter);
        self
    }

    /// Replace the ordering
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.spec = self.spec.with_order_by(order_by);
        self
    }

    /// Replace the pagination
    #[must_use]
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.spec = self.spec.with_pagination(pagination);
        self
    }

    /// Also load `relation`
    #[must_use]
    pub fn include<Rel: Relation<T>>(mut self, relation: Rel) -> Self {
        self.spec = self.spec.with_include(relation);
        self
    }

    /// The query built so far
    pub fn spec(&self) -> &QuerySpec<T> {
        &self.spec
    }

    /// SQL text the query would run, placeholders unbound
    pub fn to_sql(&self) -> RepositoryResult<String> {
        let statement = sql::select::<T>(
            RepositoryOperation::Query,
            self.spec.filter(),
            self.spec.order_by(),
            self.spec.pagination(),
        )?;
        Ok(statement.sql().to_string())
    }

    /// Every matching entity
    pub async fn fetch_all(self, cancel: &CancellationToken) -> RepositoryResult<Vec<T>> {
        let operation = RepositoryOperation::Query;
        let Self { session, spec } = self;
        let outcome = guard(
            cancel,
            operation,
            executor::fetch(session, operation, &spec, spec.pagination()),
        )
        .await;
        settle(session, outcome)
    }

    /// The first matching entity
    pub async fn first(self, cancel: &CancellationToken) -> RepositoryResult<Option<T>> {
        let operation = RepositoryOperation::Query;
        let Self { session, spec } = self;
        let outcome = guard(
            cancel,
            operation,
            executor::fetch(session, operation, &spec, Pagination::take_only(1)),
        )
        .await;
        settle(session, outcome).map(|rows| rows.into_iter().next())
    }

    /// Number of matching entities, ignoring pagination
    pub async fn count(self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::Query;
        let Self { session, spec } = self;
        let outcome = guard(
            cancel,
            operation,
            executor::count::<T>(session, operation, spec.filter()),
        )
        .await;
        settle(session, outcome)
    }

    /// One projected page plus the unpaginated count
    pub async fn fetch_page<R: 'static>(
        self,
        projection: Projection<T, R>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<PagedResult<R>> {
        let operation = RepositoryOperation::Query;
        let Self { session, spec } = self;
        let spec = spec.select(projection);
        let outcome = guard(cancel, operation, executor::page(session, operation, &spec)).await;
        settle(session, outcome)
    }
}
