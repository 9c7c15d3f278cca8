//! Eager loading of related entities
//!
//! An [`Include`] lists relations to load alongside the parent rows of a
//! query. Each [`Relation`] turns the parents into a filter over the related
//! table, and attaches what comes back. Loading never adds or removes parent
//! rows. One batched query is issued per relation, after pagination, so
//! relations are only loaded for the parents actually returned.
//!
//! # Example
//!
//! ```rust,ignore
//! struct UserAddresses;
//!
//! impl Relation<User> for UserAddresses {
//!     type Related = Address;
//!
//!     fn name(&self) -> &str {
//!         "addresses"
//!     }
//!
//!     fn related_filter(&self, users: &[User]) -> Option<Filter> {
//!         let ids: Vec<i64> = users.iter().filter_map(|u| u.id).collect();
//!         (!ids.is_empty()).then(|| Filter::is_in("user_id", ids))
//!     }
//!
//!     fn attach(&self, users: &mut [User], addresses: Vec<Address>) {
//!         for address in addresses {
//!             if let Some(user) = users.iter_mut().find(|u| u.id == Some(address.user_id)) {
//!                 user.addresses.push(address);
//!             }
//!         }
//!     }
//! }
//!
//! let spec = QuerySpec::<User>::new().with_include(UserAddresses);
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqliteConnection;

use super::error::RepositoryOperation;
use super::executor;
use super::filter::Filter;
use super::pagination::{OrderBy, Pagination};
use super::traits::{Entity, RepositoryResult};

/// A relation from `T` to another entity type
pub trait Relation<T>: Send + Sync + 'static {
    /// The related entity
    type Related: Entity;

    /// Name used in logs and debug output
    fn name(&self) -> &str;

    /// Filter selecting the related rows of `parents`
    ///
    /// `None` means there is nothing to load (e.g. no parent has a key yet).
    fn related_filter(&self, parents: &[T]) -> Option<Filter>;

    /// Ordering applied to the related rows before [`Relation::attach`]
    fn order_by(&self) -> Option<OrderBy> {
        None
    }

    /// Distribute `related` over `parents`
    fn attach(&self, parents: &mut [T], related: Vec<Self::Related>);
}

#[async_trait]
pub(crate) trait LoadRelation<T>: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self, conn: &mut SqliteConnection, parents: &mut [T]) -> RepositoryResult<()>;
}

#[async_trait]
impl<T, R> LoadRelation<T> for R
where
    T: Send + 'static,
    R: Relation<T>,
{
    fn name(&self) -> &str {
        Relation::name(self)
    }

    async fn load(&self, conn: &mut SqliteConnection, parents: &mut [T]) -> RepositoryResult<()> {
        let Some(filter) = self.related_filter(parents) else {
            return Ok(());
        };
        let order = self.order_by();
        let related = executor::select_rows::<R::Related>(
            conn,
            RepositoryOperation::LoadRelation,
            Some(&filter),
            order.as_ref(),
            Pagination::none(),
        )
        .await?;
        tracing::debug!(
            relation = Relation::name(self),
            parents = parents.len(),
            related = related.len(),
            "relation loaded"
        );
        self.attach(parents, related);
        Ok(())
    }
}

/// Relations to load with a query's results
pub struct Include<T> {
    relations: Vec<Arc<dyn LoadRelation<T>>>,
}

impl<T: Send + 'static> Include<T> {
    /// Load nothing
    pub fn none() -> Self {
        Self {
            relations: Vec::new(),
        }
    }

    /// Load a single relation
    pub fn relation<R: Relation<T>>(relation: R) -> Self {
        Self::none().and(relation)
    }

    /// Also load `relation`
    #[must_use]
    pub fn and<R: Relation<T>>(mut self, relation: R) -> Self {
        self.relations.push(Arc::new(relation));
        self
    }

    /// Merge another include list into this one
    #[must_use]
    pub fn extend(mut self, other: Include<T>) -> Self {
        self.relations.extend(other.relations);
        self
    }

    /// Whether no relations are requested
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Names of the requested relations, in load order
    pub fn names(&self) -> Vec<&str> {
        self.relations.iter().map(|r| r.name()).collect()
    }

    pub(crate) async fn load(
        &self,
        conn: &mut SqliteConnection,
        parents: &mut [T],
    ) -> RepositoryResult<()> {
        if parents.is_empty() {
            return Ok(());
        }
        for relation in &self.relations {
            relation.load(&mut *conn, parents).await?;
        }
        Ok(())
    }
}

impl<T: Send + 'static> Default for Include<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> Clone for Include<T> {
    fn clone(&self) -> Self {
        Self {
            relations: self.relations.clone(),
        }
    }
}

impl<T> fmt::Debug for Include<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.relations.iter().map(|r| r.name()))
            .finish()
    }
}
