//! Repository trait definitions
//!
//! - [`Entity`]: how a record type maps onto a table
//! - [`UnitOfWork`]: the commit boundary, using RPITIT
//!   (Return Position Impl Trait In Traits) like the rest of the crate's async traits
//!
//! # Example
//!
//! ```rust
//! use entity_repo::repository::{Entity, Value};
//!
//! #[derive(Debug, Clone, sqlx::FromRow)]
//! struct Tag {
//!     id: Option<i64>,
//!     label: String,
//! }
//!
//! impl Entity for Tag {
//!     const NAME: &'static str = "Tag";
//!     const TABLE: &'static str = "tags";
//!     const KEY: &'static str = "id";
//!     const COLUMNS: &'static [&'static str] = &["label"];
//!
//!     fn key(&self) -> Option<Value> {
//!         self.id.map(Value::from)
//!     }
//!
//!     fn values(&self) -> Vec<Value> {
//!         vec![self.label.clone().into()]
//!     }
//! }
//!
//! assert!(Tag::has_column("label"));
//! assert!(Tag::has_column("id"));
//! assert!(!Tag::has_column("colour"));
//! ```

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use tokio_util::sync::CancellationToken;

use super::error::RepositoryError;
use super::value::Value;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// A record type persisted in one table
///
/// Rows are decoded with `sqlx::FromRow`; writes go through [`Entity::values`],
/// which must yield one value per entry of [`Entity::COLUMNS`], in order.
/// The key is excluded from `COLUMNS` so that inserts can leave it to the
/// store when [`Entity::key`] returns `None`.
pub trait Entity: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static {
    /// Human-readable type name used in errors and logs
    const NAME: &'static str;
    /// Table holding the records
    const TABLE: &'static str;
    /// Key column
    const KEY: &'static str;
    /// Persisted non-key columns, in [`Entity::values`] order
    const COLUMNS: &'static [&'static str];

    /// The key value, or `None` before the store has assigned one
    fn key(&self) -> Option<Value>;

    /// Column values in [`Entity::COLUMNS`] order
    fn values(&self) -> Vec<Value>;

    /// Whether `field` names the key or a persisted column
    fn has_column(field: &str) -> bool {
        field == Self::KEY || Self::COLUMNS.contains(&field)
    }
}

/// Commit boundary over staged repository mutations
///
/// Mutations issued through a repository are staged in its session's
/// transaction and only become durable here. Dropping or disposing the
/// owner instead rolls them back.
///
/// # Example
///
/// ```rust,ignore
/// let mut users = store.repository::<User>();
/// users.create(User::new("Ada", "Lovelace"), &cancel).await?;
/// let committed = users.save_changes(&cancel).await?;
/// assert_eq!(committed, 1);
/// ```
pub trait UnitOfWork: Send {
    /// Commit every staged mutation atomically
    ///
    /// Returns the number of rows written by the committed mutations; `0`
    /// when nothing was staged. A cancelled token rolls back instead and yields a
    /// `Cancelled` error.
    fn save_changes(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Rows written by staged mutations since the last commit
    fn pending_changes(&self) -> u64;
}
