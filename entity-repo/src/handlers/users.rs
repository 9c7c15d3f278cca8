//! User commands and queries
//!
//! The write shape ([`CreateUserHandler`]) and the read shapes
//! ([`GetUserByIdHandler`], [`ListUsersHandler`]) over the generic
//! repository. Every call opens its own repository on the shared [`Store`],
//! so one request is one unit of work.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::repository::{
    Entity, Filter, OrderBy, Pagination, Projection, QuerySpec, UnitOfWork, Value,
};

use super::response::ListResponse;
use super::traits::{CommandHandler, QueryHandler};

/// Schema for the `users` table
pub const USERS_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);";

/// A stored user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Assigned by the store on insert
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    /// Filled by the column default on insert
    pub created_at: Option<NaiveDateTime>,
}

impl User {
    /// A user not yet stored
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            created_at: None,
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["first_name", "last_name"];

    fn key(&self) -> Option<Value> {
        self.id.map(Value::from)
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::from(&self.first_name), Value::from(&self.last_name)]
    }

    fn has_column(field: &str) -> bool {
        field == Self::KEY || field == "created_at" || Self::COLUMNS.contains(&field)
    }
}

/// User as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<User> for UserResponse {
    type Error = Error;

    fn try_from(user: User) -> Result<Self> {
        let id = user
            .id
            .ok_or_else(|| Error::Internal("stored user has no id".to_string()))?;
        Ok(Self {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
        })
    }
}

/// Short form used in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Option<i64>,
    pub full_name: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: format!("{} {}", user.first_name, user.last_name),
        }
    }
}

/// Register a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    pub first_name: String,
    pub last_name: String,
}

/// Look up one user
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GetUserByIdQuery {
    pub user_id: i64,
}

/// One page of users, optionally narrowed to a last name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub last_name: Option<String>,
    /// 1-indexed
    pub page: u32,
    pub per_page: u32,
}

/// Handles [`CreateUserCommand`]
#[derive(Debug, Clone)]
pub struct CreateUserHandler {
    store: Store,
}

impl CreateUserHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl CommandHandler<CreateUserCommand> for CreateUserHandler {
    type Output = UserResponse;

    async fn handle(
        &self,
        command: CreateUserCommand,
        cancel: &CancellationToken,
    ) -> Result<UserResponse> {
        let first_name = command.first_name.trim();
        let last_name = command.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(Error::Validation(
                "first_name and last_name must not be empty".to_string(),
            ));
        }

        let mut users = self.store.repository::<User>();
        let user = users.create(User::new(first_name, last_name), cancel).await?;
        users.save_changes(cancel).await?;
        users.dispose();

        tracing::info!(user_id = ?user.id, "user created");
        UserResponse::try_from(user)
    }
}

/// Handles [`GetUserByIdQuery`]
#[derive(Debug, Clone)]
pub struct GetUserByIdHandler {
    store: Store,
}

impl GetUserByIdHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl QueryHandler<GetUserByIdQuery> for GetUserByIdHandler {
    type Output = UserResponse;

    async fn handle(
        &self,
        query: GetUserByIdQuery,
        cancel: &CancellationToken,
    ) -> Result<UserResponse> {
        let spec = QuerySpec::<User>::new().with_filter(Filter::eq("id", query.user_id));

        let mut users = self.store.repository::<User>();
        let found = users.find(&spec, cancel).await?;
        users.dispose();

        match found {
            Some(user) => UserResponse::try_from(user),
            None => Err(Error::NotFound(format!("User {}", query.user_id))),
        }
    }
}

/// Handles [`ListUsersQuery`]
#[derive(Debug, Clone)]
pub struct ListUsersHandler {
    store: Store,
}

impl ListUsersHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl QueryHandler<ListUsersQuery> for ListUsersHandler {
    type Output = ListResponse<UserSummary>;

    async fn handle(
        &self,
        query: ListUsersQuery,
        cancel: &CancellationToken,
    ) -> Result<ListResponse<UserSummary>> {
        let per_page = query.per_page.max(1);
        let page = query.page.max(1);

        let mut spec = QuerySpec::<User>::new()
            .with_order_by(OrderBy::asc("last_name").then_asc("first_name").then_asc("id"))
            .with_pagination(Pagination::page(u64::from(page), u64::from(per_page)));
        if let Some(last_name) = query.last_name {
            spec = spec.with_filter(Filter::eq("last_name", last_name));
        }
        let spec = spec.select(Projection::<User, UserSummary>::new("summary", UserSummary::from));

        let mut users = self.store.repository::<User>();
        let result = users.get_projected(&spec, cancel).await?;
        users.dispose();

        Ok(ListResponse::from_page(result, page, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    async fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("users.db").display());
        let store = Store::connect(&StoreConfig::with_url(url)).await.unwrap();
        store.execute_script(USERS_SCHEMA).await.unwrap();
        (dir, store)
    }

    fn create(first: &str, last: &str) -> CreateUserCommand {
        CreateUserCommand {
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_by_id() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();

        let created = CreateUserHandler::new(store.clone())
            .handle(create(" Ada ", "Lovelace"), &cancel)
            .await
            .unwrap();
        assert_eq!(created.first_name, "Ada");
        assert!(created.created_at.is_some());

        let fetched = GetUserByIdHandler::new(store)
            .handle(GetUserByIdQuery { user_id: created.id }, &cancel)
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_user_is_not_found() {
        let (_dir, store) = store().await;
        let err = GetUserByIdHandler::new(store)
            .handle(GetUserByIdQuery { user_id: 42 }, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_names() {
        let (_dir, store) = store().await;
        let err = CreateUserHandler::new(store)
            .handle(create("  ", "Hopper"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancelled_create_persists_nothing() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = CreateUserHandler::new(store.clone())
            .handle(create("Grace", "Hopper"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Repository(_)));

        let listed = ListUsersHandler::new(store)
            .handle(
                ListUsersQuery {
                    last_name: None,
                    page: 1,
                    per_page: 10,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(listed.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_list_users_pages_and_filters() {
        let (_dir, store) = store().await;
        let cancel = CancellationToken::new();
        let creator = CreateUserHandler::new(store.clone());
        for (first, last) in [
            ("Ada", "Lovelace"),
            ("Grace", "Hopper"),
            ("Alan", "Turing"),
            ("Byron", "Lovelace"),
        ] {
            creator.handle(create(first, last), &cancel).await.unwrap();
        }

        let lister = ListUsersHandler::new(store);
        let page = lister
            .handle(
                ListUsersQuery {
                    last_name: None,
                    page: 2,
                    per_page: 3,
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 4);
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].full_name, "Alan Turing");

        let lovelaces = lister
            .handle(
                ListUsersQuery {
                    last_name: Some("Lovelace".to_string()),
                    page: 1,
                    per_page: 10,
                },
                &cancel,
            )
            .await
            .unwrap();
        let names: Vec<_> = lovelaces.data.iter().map(|u| u.full_name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Byron Lovelace"]);
    }
}
