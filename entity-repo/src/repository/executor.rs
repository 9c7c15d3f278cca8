//! Statement execution against a session's transaction

use sqlx::{Connection, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::DatabaseError;

use super::error::{RepositoryError, RepositoryOperation};
use super::filter::Filter;
use super::pagination::{OrderBy, Pagination};
use super::query::{PagedResult, QuerySpec};
use super::session::Session;
use super::sql;
use super::traits::{Entity, RepositoryResult};
use super::value::Value;

/// Map a driver error into a storage error for entity `T`
fn storage<T: Entity>(operation: RepositoryOperation) -> impl Fn(sqlx::Error) -> RepositoryError {
    move |err| {
        RepositoryError::from(DatabaseError::from(err))
            .with_operation(operation)
            .with_entity_type(T::NAME)
    }
}

pub(crate) async fn select_rows<T: Entity>(
    conn: &mut SqliteConnection,
    operation: RepositoryOperation,
    filter: Option<&Filter>,
    order_by: Option<&OrderBy>,
    pagination: Pagination,
) -> RepositoryResult<Vec<T>> {
    let mut statement = sql::select::<T>(operation, filter, order_by, pagination)?;
    if pagination.is_applied() && order_by.is_none() {
        debug!(
            entity = T::NAME,
            %operation,
            "paginating without order_by; row order is whatever the store returns"
        );
    }
    debug!(entity = T::NAME, %operation, sql = statement.sql(), "executing select");
    statement
        .build_query_as::<T>()
        .fetch_all(&mut *conn)
        .await
        .map_err(storage::<T>(operation))
}

async fn count_rows<T: Entity>(
    conn: &mut SqliteConnection,
    operation: RepositoryOperation,
    filter: Option<&Filter>,
) -> RepositoryResult<u64> {
    let mut statement = sql::count::<T>(operation, filter)?;
    debug!(entity = T::NAME, %operation, sql = statement.sql(), "executing count");
    let count: i64 = statement
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await
        .map_err(storage::<T>(operation))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Filter, order, paginate, then load includes
pub(crate) async fn fetch<T: Entity, R>(
    session: &mut Session,
    operation: RepositoryOperation,
    spec: &QuerySpec<T, R>,
    pagination: Pagination,
) -> RepositoryResult<Vec<T>> {
    let conn = session.connection(operation).await?;
    let mut rows =
        select_rows::<T>(conn, operation, spec.filter(), spec.order_by(), pagination).await?;
    spec.include()
        .load(conn, &mut rows)
        .await
        .map_err(|e| e.with_operation(operation))?;
    Ok(rows)
}

pub(crate) async fn count<T: Entity>(
    session: &mut Session,
    operation: RepositoryOperation,
    filter: Option<&Filter>,
) -> RepositoryResult<u64> {
    let conn = session.connection(operation).await?;
    count_rows::<T>(conn, operation, filter).await
}

/// One projected page plus the unpaginated count, on the same transaction
pub(crate) async fn page<T: Entity, R>(
    session: &mut Session,
    operation: RepositoryOperation,
    spec: &QuerySpec<T, R>,
) -> RepositoryResult<PagedResult<R>> {
    let rows = fetch(session, operation, spec, spec.pagination()).await?;
    let total_count = count::<T>(session, operation, spec.filter()).await?;
    let projection = spec.projection();
    debug!(
        entity = T::NAME,
        projection = projection.name(),
        returned = rows.len(),
        total_count,
        "page loaded"
    );
    Ok(PagedResult::new(
        rows.into_iter().map(|row| projection.apply(row)).collect(),
        total_count,
    ))
}

pub(crate) async fn insert<T: Entity>(session: &mut Session, entity: &T) -> RepositoryResult<T> {
    let operation = RepositoryOperation::Create;
    let mut statement = sql::insert(operation, entity)?;
    let conn = session.connection(operation).await?;
    debug!(entity = T::NAME, sql = statement.sql(), "executing insert");
    let created = statement
        .build_query_as::<T>()
        .fetch_one(&mut *conn)
        .await
        .map_err(storage::<T>(operation))?;
    session.record_changes(1);
    Ok(created)
}

pub(crate) async fn update<T: Entity>(session: &mut Session, entity: &T) -> RepositoryResult<bool> {
    let operation = RepositoryOperation::Update;
    let mut statement = sql::update(operation, entity)?;
    let conn = session.connection(operation).await?;
    debug!(entity = T::NAME, sql = statement.sql(), "executing update");
    let changed = statement
        .build()
        .execute(&mut *conn)
        .await
        .map_err(storage::<T>(operation))?
        .rows_affected();
    session.record_changes(changed);
    Ok(changed > 0)
}

/// Run every statement inside one savepoint; any failure undoes the batch
async fn run_batch<T: Entity>(
    session: &mut Session,
    operation: RepositoryOperation,
    statements: Vec<sql::Statement>,
) -> RepositoryResult<u64> {
    if statements.is_empty() {
        return Ok(0);
    }
    let conn = session.connection(operation).await?;
    let mut savepoint = Connection::begin(conn)
        .await
        .map_err(storage::<T>(operation))?;
    let mut changed = 0;
    for (index, mut statement) in statements.into_iter().enumerate() {
        match statement.build().execute(&mut *savepoint).await {
            Ok(result) => changed += result.rows_affected(),
            Err(err) => {
                debug!(entity = T::NAME, %operation, index, "batch statement failed; rolling back batch");
                savepoint
                    .rollback()
                    .await
                    .map_err(storage::<T>(operation))?;
                return Err(storage::<T>(operation)(err));
            }
        }
    }
    savepoint.commit().await.map_err(storage::<T>(operation))?;
    session.record_changes(changed);
    Ok(changed)
}

pub(crate) async fn insert_batch<T: Entity>(
    session: &mut Session,
    entities: &[T],
) -> RepositoryResult<u64> {
    let operation = RepositoryOperation::CreateRange;
    let statements = entities
        .iter()
        .map(|entity| sql::insert(operation, entity))
        .collect::<RepositoryResult<Vec<_>>>()?;
    debug!(entity = T::NAME, count = statements.len(), "executing batch insert");
    run_batch::<T>(session, operation, statements).await
}

pub(crate) async fn update_batch<T: Entity>(
    session: &mut Session,
    entities: &[T],
) -> RepositoryResult<bool> {
    let operation = RepositoryOperation::UpdateRange;
    let statements = entities
        .iter()
        .map(|entity| sql::update(operation, entity))
        .collect::<RepositoryResult<Vec<_>>>()?;
    debug!(entity = T::NAME, count = statements.len(), "executing batch update");
    Ok(run_batch::<T>(session, operation, statements).await? > 0)
}

/// Caller-supplied SQL with positional `?` parameters
///
/// Parameter values are never logged.
pub(crate) async fn raw<T: Entity>(
    session: &mut Session,
    sql: &str,
    params: Vec<Value>,
) -> RepositoryResult<Vec<T>> {
    let operation = RepositoryOperation::RawQuery;
    let mut query = sqlx::query_as::<Sqlite, T>(sql);
    for (index, value) in params.into_iter().enumerate() {
        query = match value {
            Value::String(s) => query.bind(s),
            Value::Integer(n) => query.bind(n),
            Value::Float(n) => query.bind(n),
            Value::Boolean(b) => query.bind(b),
            Value::Null => query.bind(Option::<String>::None),
            list @ (Value::StringList(_) | Value::IntegerList(_)) => {
                return Err(RepositoryError::invalid_argument(
                    operation,
                    format!(
                        "parameter {} is a {}; raw queries bind scalars only",
                        index + 1,
                        list.type_name()
                    ),
                )
                .with_entity_type(T::NAME));
            }
        };
    }
    let conn = session.connection(operation).await?;
    debug!(entity = T::NAME, sql, "executing raw query");
    query.fetch_all(&mut *conn).await.map_err(storage::<T>(operation))
}
