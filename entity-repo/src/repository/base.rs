//! The generic repository
//!
//! [`Repository`] runs [`QuerySpec`]s and persistence calls for one entity
//! type through a [`Session`]. It either owns the session
//! ([`Repository::open`], one repository per unit of work) or borrows one
//! that several repositories share ([`Session::repository`]).
//!
//! Every operation takes a [`CancellationToken`]. A cancelled operation
//! returns no partial result and rolls back the session's transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let mut users = store.repository::<User>();
//!
//! let ada = users.create(User::new("Ada", "Lovelace"), &cancel).await?;
//! users.save_changes(&cancel).await?;
//!
//! let page = users
//!     .get_projected(
//!         &QuerySpec::new()
//!             .with_filter(Filter::ne("first_name", "B"))
//!             .with_order_by(OrderBy::desc("id"))
//!             .skip(0)
//!             .take(10)
//!             .select(Projection::new("summary", UserSummary::from)),
//!         &cancel,
//!     )
//!     .await?;
//!
//! users.dispose();
//! ```

use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::database::Store;

use super::error::{RepositoryError, RepositoryOperation};
use super::executor;
use super::filter::Filter;
use super::handle::QueryHandle;
use super::include::Include;
use super::pagination::Pagination;
use super::query::{PagedResult, QuerySpec};
use super::session::{guard, settle, Session};
use super::traits::{Entity, RepositoryResult, UnitOfWork};
use super::value::Value;

enum Handle<'s> {
    Owned(Session),
    Borrowed(&'s mut Session),
}

impl Handle<'_> {
    fn session(&mut self) -> &mut Session {
        match self {
            Self::Owned(session) => session,
            Self::Borrowed(session) => session,
        }
    }

    fn session_ref(&self) -> &Session {
        match self {
            Self::Owned(session) => session,
            Self::Borrowed(session) => session,
        }
    }
}

/// Repository over entity `T`
pub struct Repository<'s, T> {
    handle: Option<Handle<'s>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<'static, T> {
    /// A repository owning a fresh session on `store`
    pub fn open(store: &Store) -> Self {
        Self::from_session(store.session())
    }

    /// A repository owning `session`
    pub fn from_session(session: Session) -> Self {
        Self {
            handle: Some(Handle::Owned(session)),
            _entity: PhantomData,
        }
    }
}

impl<'s, T: Entity> Repository<'s, T> {
    pub(crate) fn borrowed(session: &'s mut Session) -> Self {
        Self {
            handle: Some(Handle::Borrowed(session)),
            _entity: PhantomData,
        }
    }

    /// Whether [`Repository::dispose`] has run
    pub fn is_disposed(&self) -> bool {
        self.handle.is_none()
    }

    /// Release the handle
    ///
    /// An owned session is closed, rolling back anything not committed. A
    /// borrowed session is left to its owner. Calling this again does nothing;
    /// any other call afterwards fails with a `Disposed` error.
    pub fn dispose(&mut self) {
        match self.handle.take() {
            Some(Handle::Owned(mut session)) => {
                session.close();
                debug!(entity = T::NAME, session = %session.id(), "repository disposed");
            }
            Some(Handle::Borrowed(session)) => {
                debug!(entity = T::NAME, session = %session.id(), "repository detached from session");
            }
            None => {}
        }
    }

    fn session(&mut self, operation: RepositoryOperation) -> RepositoryResult<&mut Session> {
        let session = self
            .handle
            .as_mut()
            .map(Handle::session)
            .ok_or_else(|| RepositoryError::disposed(operation).with_entity_type(T::NAME))?;
        session
            .ensure_open(operation)
            .map_err(|e| e.with_entity_type(T::NAME))?;
        Ok(session)
    }

    /// Insert one entity and return it as stored, with key and defaults filled in
    ///
    /// The insert is staged; [`UnitOfWork::save_changes`] makes it durable.
    pub async fn create(&mut self, entity: T, cancel: &CancellationToken) -> RepositoryResult<T> {
        let operation = RepositoryOperation::Create;
        let session = self.session(operation)?;
        let outcome = guard(cancel, operation, executor::insert(session, &entity)).await;
        settle(session, outcome)
    }

    /// Insert every entity, or none of them
    pub async fn create_range(
        &mut self,
        entities: Vec<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let operation = RepositoryOperation::CreateRange;
        let session = self.session(operation)?;
        let outcome = guard(cancel, operation, executor::insert_batch(session, &entities)).await;
        settle(session, outcome).map(|_| ())
    }

    /// Write every column of `entity`, matched by key
    ///
    /// Returns whether a row changed. An entity without a key is an
    /// `InvalidArgument` error.
    pub async fn update(&mut self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<bool> {
        let operation = RepositoryOperation::Update;
        let session = self.session(operation)?;
        let outcome = guard(cancel, operation, executor::update(session, entity)).await;
        settle(session, outcome)
    }

    /// Update every entity, or none of them; returns whether any row changed
    pub async fn update_range(
        &mut self,
        entities: &[T],
        cancel: &CancellationToken,
    ) -> RepositoryResult<bool> {
        let operation = RepositoryOperation::UpdateRange;
        let session = self.session(operation)?;
        let outcome = guard(cancel, operation, executor::update_batch(session, entities)).await;
        settle(session, outcome)
    }

    /// First entity matching the query's filter and ordering, with includes loaded
    ///
    /// The query's pagination and projection are ignored.
    pub async fn find<R>(
        &mut self,
        spec: &QuerySpec<T, R>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<T>> {
        let operation = RepositoryOperation::Find;
        let session = self.session(operation)?;
        let outcome = guard(
            cancel,
            operation,
            executor::fetch(session, operation, spec, Pagination::take_only(1)),
        )
        .await;
        settle(session, outcome).map(|rows| rows.into_iter().next())
    }

    /// Every entity the query selects, fully materialized
    ///
    /// The query's projection is ignored; see [`Repository::get_projected`].
    pub async fn get<R>(
        &mut self,
        spec: &QuerySpec<T, R>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        let operation = RepositoryOperation::Get;
        let session = self.session(operation)?;
        let outcome = guard(
            cancel,
            operation,
            executor::fetch(session, operation, spec, spec.pagination()),
        )
        .await;
        settle(session, outcome)
    }

    /// One projected page plus the number of entities matching the filter
    pub async fn get_projected<R>(
        &mut self,
        spec: &QuerySpec<T, R>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<PagedResult<R>> {
        let operation = RepositoryOperation::GetProjected;
        let session = self.session(operation)?;
        let outcome = guard(cancel, operation, executor::page(session, operation, spec)).await;
        settle(session, outcome)
    }

    /// Number of entities matching the query's filter
    ///
    /// Includes, ordering and pagination do not affect the count.
    pub async fn count<R>(
        &mut self,
        spec: &QuerySpec<T, R>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        let operation = RepositoryOperation::Count;
        let session = self.session(operation)?;
        let outcome = guard(
            cancel,
            operation,
            executor::count::<T>(session, operation, spec.filter()),
        )
        .await;
        settle(session, outcome)
    }

    /// A composable query over the session, not yet executed
    pub fn query(
        &mut self,
        filter: Option<Filter>,
        include: Include<T>,
    ) -> RepositoryResult<QueryHandle<'_, T>> {
        let session = self.session(RepositoryOperation::Query)?;
        let mut spec = QuerySpec::new().with_includes(include);
        if let Some(filter) = filter {
            spec = spec.with_filter(filter);
        }
        Ok(QueryHandle::new(session, spec))
    }

    /// Run caller-supplied SQL, binding `params` to its `?` placeholders in order
    ///
    /// The text is passed to SQLite unchanged. Never build `sql` from
    /// untrusted input; pass such values through `params` instead.
    pub async fn get_with_raw_sql(
        &mut self,
        sql: &str,
        params: Vec<Value>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        let operation = RepositoryOperation::RawQuery;
        let session = self.session(operation)?;
        let outcome = guard(cancel, operation, executor::raw(session, sql, params)).await;
        settle(session, outcome)
    }
}

impl<T: Entity> UnitOfWork for Repository<'_, T> {
    async fn save_changes(&mut self, cancel: &CancellationToken) -> RepositoryResult<u64> {
        self.session(RepositoryOperation::SaveChanges)?
            .save_changes(cancel)
            .await
            .map_err(|e| e.with_entity_type(T::NAME))
    }

    fn pending_changes(&self) -> u64 {
        self.handle
            .as_ref()
            .map_or(0, |handle| handle.session_ref().pending_changes())
    }
}

impl<T> std::fmt::Debug for Repository<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Repository");
        match &self.handle {
            Some(Handle::Owned(session)) => s.field("session", session).field("owned", &true),
            Some(Handle::Borrowed(session)) => s.field("session", session).field("owned", &false),
            None => s.field("disposed", &true),
        };
        s.finish()
    }
}
