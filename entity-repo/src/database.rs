//! SQLite connection pool management

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::{
    config::StoreConfig,
    error::{sanitize_url, DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result},
    repository::{Entity, Repository, Session},
};

/// Shared handle on the backing database
///
/// Cheap to clone; every clone uses the same pool. Each [`Session`] takes one
/// pooled connection for as long as it holds a transaction.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the pool described by `config`, retrying with exponential backoff
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = create_pool_with_retries(config, config.max_retries).await?;
        Ok(Self { pool })
    }

    /// Wrap an already configured pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A new session for one unit of work
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone())
    }

    /// A repository for `T` owning a new session
    pub fn repository<T: Entity>(&self) -> Repository<'static, T> {
        Repository::open(self)
    }

    /// Run a batch of semicolon separated statements, e.g. schema DDL
    pub async fn execute_script(&self, script: &str) -> Result<()> {
        sqlx::raw_sql(script)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let mut err = DatabaseError::from(e);
                err.operation = DatabaseOperation::Migration;
                Error::Database(err)
            })?;
        tracing::debug!("Schema script executed");
        Ok(())
    }

    /// Close every pooled connection
    ///
    /// Sessions still holding a connection finish first.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Store closed");
    }

    /// Whether [`Store::close`] has run
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Create a SQLite connection pool with configurable retries
///
/// Uses exponential backoff strategy for retries
async fn create_pool_with_retries(config: &StoreConfig, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created for {}: max={}, min={}",
                        sanitize_url(&config.url),
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay_multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1));
                let delay = base_delay.saturating_mul(delay_multiplier);

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &StoreConfig) -> Result<SqlitePool> {
    let url_safe = sanitize_url(&config.url);
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            Error::Database(
                DatabaseError::new(
                    DatabaseOperation::Connect,
                    DatabaseErrorKind::Configuration,
                    format!("Invalid SQLite url: {}", e),
                )
                .add_context(url_safe.clone()),
            )
        })?
        .create_if_missing(config.create_if_missing)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::Internal(format!(
                "Failed to connect to database at '{}': {}\n\n\
                Troubleshooting:\n\
                1. Check the url format: sqlite://path/to/file.db\n\
                2. Verify the directory exists and is writable\n\
                3. Set store.create_if_missing = true for a new database\n\
                4. Another process may hold an exclusive lock on the file\n\n\
                Original error: {}",
                url_safe,
                categorize_db_error(&e),
                e
            ))
        })?;

    Ok(pool)
}

/// Categorize database error for better user guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Configuration error",
        Error::Database(_) => "Database error",
        Error::Io(_) => "File I/O error - check path and permissions",
        Error::PoolTimedOut => "Connection pool timeout - database may be locked",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> StoreConfig {
        StoreConfig::with_url(format!("sqlite://{}", dir.path().join("store.db").display()))
    }

    #[tokio::test]
    async fn test_connect_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&config_in(&dir)).await.unwrap();
        store
            .execute_script("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);")
            .await
            .unwrap();
        assert!(dir.path().join("store.db").exists());

        store.close().await;
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn test_connect_fails_without_create_if_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        config.create_if_missing = false;
        config.max_retries = 0;

        let err = Store::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_bad_script_is_a_migration_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&config_in(&dir)).await.unwrap();
        let err = store.execute_script("CREATE TABLE (").await.unwrap_err();
        match err {
            Error::Database(db) => assert_eq!(db.operation, DatabaseOperation::Migration),
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[test]
    fn test_categorize_db_error() {
        assert_eq!(
            categorize_db_error(&sqlx::Error::PoolTimedOut),
            "Connection pool timeout - database may be locked"
        );
    }
}
