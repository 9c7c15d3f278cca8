//! Generic repository over SQLite
//!
//! Application code describes reads declaratively and lets one generic
//! [`Repository`] run them for any [`Entity`], instead of writing data access
//! code per entity.
//!
//! # Features
//!
//! - **Query composition**: [`QuerySpec`] bundles a [`Filter`], an [`OrderBy`],
//!   an [`Include`], a [`Pagination`] and a [`Projection`]
//! - **Paging policy**: four skip/take windows, with `-1 = unset` support via
//!   [`Pagination::from_sentinels`]
//! - **Paged reads**: [`Repository::get_projected`] returns a [`PagedResult`]
//!   whose `total_count` ignores pagination
//! - **Unit of work**: writes are staged in a [`Session`] transaction until
//!   [`UnitOfWork::save_changes`]
//! - **Escape hatch**: [`Repository::get_with_raw_sql`] for hand-written SQL
//!
//! # Example
//!
//! ```rust,ignore
//! use entity_repo::repository::{Filter, OrderBy, QuerySpec, UnitOfWork};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let mut users = store.repository::<User>();
//!
//! let recent = users
//!     .get(
//!         &QuerySpec::new()
//!             .with_filter(Filter::ne("last_name", "B"))
//!             .with_order_by(OrderBy::desc("id"))
//!             .take(20),
//!         &cancel,
//!     )
//!     .await?;
//! ```

mod base;
mod error;
mod executor;
mod filter;
mod handle;
mod include;
mod pagination;
mod query;
mod session;
mod sql;
mod traits;
mod value;

// Re-export all public types
pub use base::Repository;
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use filter::{Filter, FilterCondition, FilterOperator};
pub use handle::QueryHandle;
pub use include::{Include, Relation};
pub use pagination::{OrderBy, OrderDirection, OrderKey, PageWindow, Pagination};
pub use query::{PagedResult, Projection, QuerySpec};
pub use session::Session;
pub use traits::{Entity, RepositoryResult, UnitOfWork};
pub use value::Value;
