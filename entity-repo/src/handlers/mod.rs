//! Command and query handlers over the repository
//!
//! Handlers sit at the request boundary: each takes one immutable request
//! object, runs it against a repository opened for that call, and maps the
//! resulting entities into a response type. The repository layer never sees
//! response types.
//!
//! # Example
//!
//! ```rust,no_run
//! use entity_repo::handlers::{
//!     CommandHandler, CreateUserCommand, CreateUserHandler, GetUserByIdHandler, GetUserByIdQuery,
//!     QueryHandler, USERS_SCHEMA,
//! };
//! use entity_repo::prelude::*;
//!
//! # async fn run(store: Store) -> Result<()> {
//! let cancel = CancellationToken::new();
//! store.execute_script(USERS_SCHEMA).await?;
//!
//! let created = CreateUserHandler::new(store.clone())
//!     .handle(
//!         CreateUserCommand {
//!             first_name: "Ada".to_string(),
//!             last_name: "Lovelace".to_string(),
//!         },
//!         &cancel,
//!     )
//!     .await?;
//!
//! let fetched = GetUserByIdHandler::new(store)
//!     .handle(GetUserByIdQuery { user_id: created.id }, &cancel)
//!     .await?;
//! assert_eq!(fetched.first_name, "Ada");
//! # Ok(())
//! # }
//! ```

mod response;
mod traits;
mod users;

// Re-export all public types
pub use response::{ListResponse, PaginationMeta};
pub use traits::{CommandHandler, QueryHandler};
pub use users::{
    CreateUserCommand, CreateUserHandler, GetUserByIdHandler, GetUserByIdQuery, ListUsersHandler,
    ListUsersQuery, User, UserResponse, UserSummary, USERS_SCHEMA,
};
