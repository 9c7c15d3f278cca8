//! # entity-repo
//!
//! Generic data access over SQLite: one [`Repository`](repository::Repository)
//! serves every entity type, driven by declarative query fragments instead of
//! per-entity data access code.
//!
//! ## Features
//!
//! - **Query composition**: filter, ordering, eager loading, pagination and
//!   projection bundled in a [`QuerySpec`](repository::QuerySpec)
//! - **Paged reads**: projected pages carry the unpaginated match count
//! - **Unit of work**: writes are staged in a transaction and committed once
//! - **Cancellation**: every store round trip races a `CancellationToken`
//! - **Configuration**: Figment with XDG lookup and environment overrides
//! - **Observability**: structured JSON logging through `tracing`
//!
//! ## Example
//!
//! ```rust,no_run
//! use entity_repo::prelude::*;
//! use entity_repo::handlers::{User, USERS_SCHEMA};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Open the store
//!     let store = Store::connect(&config.store).await?;
//!     store.execute_script(USERS_SCHEMA).await?;
//!
//!     let cancel = CancellationToken::new();
//!     let mut users = store.repository::<User>();
//!     users.create(User::new("Ada", "Lovelace"), &cancel).await?;
//!     users.save_changes(&cancel).await?;
//!
//!     let page = users
//!         .get_projected(
//!             &QuerySpec::<User>::new()
//!                 .with_filter(Filter::ne("last_name", "B"))
//!                 .with_order_by(OrderBy::desc("id"))
//!                 .take(10),
//!             &cancel,
//!         )
//!         .await?;
//!     println!("{} of {}", page.len(), page.total_count);
//!
//!     users.dispose();
//!     store.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod repository;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, ServiceConfig, StoreConfig};
    pub use crate::database::Store;
    pub use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::repository::{
        Entity, Filter, Include, OrderBy, OrderDirection, PagedResult, Pagination, Projection,
        QuerySpec, Relation, Repository, RepositoryError, RepositoryErrorKind, RepositoryResult,
        Session, UnitOfWork, Value,
    };

    pub use tokio_util::sync::CancellationToken;
}
