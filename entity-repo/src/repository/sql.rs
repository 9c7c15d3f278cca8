//! Statement composition for SQLite
//!
//! Identifiers come from [`Entity`] constants and from filter/order fields
//! that have been checked against those constants; every operand is bound
//! with `push_bind`.

use sqlx::{QueryBuilder, Sqlite};

use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Filter, FilterCondition, FilterOperator};
use super::pagination::{OrderBy, PageWindow, Pagination};
use super::traits::{Entity, RepositoryResult};
use super::value::Value;

pub(crate) type Statement = QueryBuilder<'static, Sqlite>;

/// `SELECT * FROM table [WHERE ..] [ORDER BY ..] [LIMIT .. OFFSET ..]`
pub(crate) fn select<T: Entity>(
    operation: RepositoryOperation,
    filter: Option<&Filter>,
    order_by: Option<&OrderBy>,
    pagination: Pagination,
) -> RepositoryResult<Statement> {
    validate::<T>(operation, filter, order_by)?;

    let mut statement = QueryBuilder::new("SELECT * FROM ");
    statement.push(T::TABLE);
    push_where(&mut statement, filter);
    if let Some(order_by) = order_by {
        push_order(&mut statement, order_by);
    }
    push_pagination(&mut statement, pagination);
    Ok(statement)
}

/// `SELECT COUNT(*) FROM table [WHERE ..]`
pub(crate) fn count<T: Entity>(
    operation: RepositoryOperation,
    filter: Option<&Filter>,
) -> RepositoryResult<Statement> {
    validate::<T>(operation, filter, None)?;

    let mut statement = QueryBuilder::new("SELECT COUNT(*) FROM ");
    statement.push(T::TABLE);
    push_where(&mut statement, filter);
    Ok(statement)
}

/// `INSERT INTO table (..) VALUES (..) RETURNING *`
///
/// The key column is written only when the entity already carries a key.
pub(crate) fn insert<T: Entity>(
    operation: RepositoryOperation,
    entity: &T,
) -> RepositoryResult<Statement> {
    let mut columns: Vec<&str> = Vec::with_capacity(T::COLUMNS.len() + 1);
    let mut values: Vec<Value> = Vec::with_capacity(T::COLUMNS.len() + 1);
    if let Some(key) = entity.key().filter(|key| !key.is_null()) {
        columns.push(T::KEY);
        values.push(key);
    }
    columns.extend_from_slice(T::COLUMNS);
    values.extend(column_values(operation, entity)?);

    let mut statement = QueryBuilder::new("INSERT INTO ");
    statement.push(T::TABLE);
    if columns.is_empty() {
        statement.push(" DEFAULT VALUES");
    } else {
        statement.push(" (").push(columns.join(", ")).push(") VALUES (");
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                statement.push(", ");
            }
            push_value(&mut statement, value);
        }
        statement.push(")");
    }
    statement.push(" RETURNING *");
    Ok(statement)
}

/// `UPDATE table SET .. WHERE key = ?`
pub(crate) fn update<T: Entity>(
    operation: RepositoryOperation,
    entity: &T,
) -> RepositoryResult<Statement> {
    let key = entity
        .key()
        .filter(|key| !key.is_null())
        .ok_or_else(|| {
            RepositoryError::invalid_argument(operation, "entity has no identity to update by")
                .with_entity_type(T::NAME)
        })?;
    if T::COLUMNS.is_empty() {
        return Err(RepositoryError::invalid_argument(
            operation,
            "entity declares no columns to update",
        )
        .with_entity(T::NAME, key.to_string()));
    }
    let values = column_values(operation, entity)?;

    let mut statement = QueryBuilder::new("UPDATE ");
    statement.push(T::TABLE).push(" SET ");
    for (i, (column, value)) in T::COLUMNS.iter().zip(values.iter()).enumerate() {
        if i > 0 {
            statement.push(", ");
        }
        statement.push(*column).push(" = ");
        push_value(&mut statement, value);
    }
    statement.push(" WHERE ").push(T::KEY).push(" = ");
    push_value(&mut statement, &key);
    Ok(statement)
}

fn validate<T: Entity>(
    operation: RepositoryOperation,
    filter: Option<&Filter>,
    order_by: Option<&OrderBy>,
) -> RepositoryResult<()> {
    if let Some(filter) = filter {
        filter.validate(operation, T::NAME, T::has_column)?;
    }
    if let Some(order_by) = order_by {
        order_by.validate(operation, T::NAME, T::has_column)?;
    }
    Ok(())
}

fn column_values<T: Entity>(
    operation: RepositoryOperation,
    entity: &T,
) -> RepositoryResult<Vec<Value>> {
    let values = entity.values();
    if values.len() != T::COLUMNS.len() {
        return Err(RepositoryError::invalid_argument(
            operation,
            format!(
                "entity produced {} values for {} columns",
                values.len(),
                T::COLUMNS.len()
            ),
        )
        .with_entity_type(T::NAME));
    }
    if let Some((column, value)) = T::COLUMNS.iter().zip(&values).find(|(_, v)| v.is_list()) {
        return Err(RepositoryError::invalid_argument(
            operation,
            format!("column '{}' cannot store a {}", column, value.type_name()),
        )
        .with_entity_type(T::NAME));
    }
    Ok(values)
}

fn push_where(statement: &mut Statement, filter: Option<&Filter>) {
    if let Some(filter) = filter {
        statement.push(" WHERE ");
        push_filter(statement, filter);
    }
}

fn push_filter(statement: &mut Statement, filter: &Filter) {
    match filter {
        Filter::Condition(condition) => push_condition(statement, condition),
        Filter::And(parts) => push_group(statement, parts, " AND ", "1 = 1"),
        Filter::Or(parts) => push_group(statement, parts, " OR ", "1 = 0"),
        // An unknown inner result counts as false, so NOT keeps the row
        Filter::Not(inner) => {
            statement.push("NOT COALESCE((");
            push_filter(statement, inner);
            statement.push("), 0)");
        }
    }
}

fn push_group(statement: &mut Statement, parts: &[Filter], separator: &str, empty: &str) {
    if parts.is_empty() {
        statement.push(empty);
        return;
    }
    statement.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            statement.push(separator);
        }
        push_filter(statement, part);
    }
    statement.push(")");
}

fn push_condition(statement: &mut Statement, condition: &FilterCondition) {
    let field = condition.field.as_str();
    match (condition.operator, &condition.value) {
        (FilterOperator::IsNull, _) | (FilterOperator::Equal, Value::Null) => {
            statement.push(field).push(" IS NULL");
        }
        (FilterOperator::IsNotNull, _) | (FilterOperator::NotEqual, Value::Null) => {
            statement.push(field).push(" IS NOT NULL");
        }
        (FilterOperator::In, Value::StringList(items)) if items.is_empty() => {
            statement.push("1 = 0");
        }
        (FilterOperator::In, Value::IntegerList(items)) if items.is_empty() => {
            statement.push("1 = 0");
        }
        (FilterOperator::In, value) => {
            statement.push(field).push(" IN ");
            if value.is_list() {
                push_value(statement, value);
            } else {
                statement.push("(");
                push_value(statement, value);
                statement.push(")");
            }
        }
        (FilterOperator::NotEqual, value) => {
            statement.push(field).push(" IS NOT ");
            push_value(statement, value);
        }
        (operator, value) => {
            statement.push(field).push(" ").push(operator).push(" ");
            push_value(statement, value);
        }
    }
}

/// Bind one value; lists become a parenthesised, comma separated group
fn push_value(statement: &mut Statement, value: &Value) {
    match value {
        Value::String(s) => {
            statement.push_bind(s.clone());
        }
        Value::Integer(n) => {
            statement.push_bind(*n);
        }
        Value::Float(n) => {
            statement.push_bind(*n);
        }
        Value::Boolean(b) => {
            statement.push_bind(*b);
        }
        Value::Null => {
            statement.push_bind(Option::<String>::None);
        }
        Value::StringList(items) => {
            statement.push("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    statement.push(", ");
                }
                statement.push_bind(item.clone());
            }
            statement.push(")");
        }
        Value::IntegerList(items) => {
            statement.push("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    statement.push(", ");
                }
                statement.push_bind(*item);
            }
            statement.push(")");
        }
    }
}

fn push_order(statement: &mut Statement, order_by: &OrderBy) {
    statement.push(" ORDER BY ");
    for (i, key) in order_by.keys().iter().enumerate() {
        if i > 0 {
            statement.push(", ");
        }
        statement
            .push(key.field.as_str())
            .push(" ")
            .push(key.direction.as_sql());
    }
}

fn push_pagination(statement: &mut Statement, pagination: Pagination) {
    match pagination.window() {
        PageWindow::Full => {}
        // SQLite has no OFFSET without LIMIT; a negative limit means unbounded
        PageWindow::Skip(skip) => {
            statement.push(" LIMIT -1 OFFSET ").push_bind(bound(skip));
        }
        PageWindow::Take(take) => {
            statement.push(" LIMIT ").push_bind(bound(take));
        }
        PageWindow::SkipTake { skip, take } => {
            statement
                .push(" LIMIT ")
                .push_bind(bound(take))
                .push(" OFFSET ")
                .push_bind(bound(skip));
        }
    }
}

fn bound(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;

    #[derive(Debug, Clone, sqlx::FromRow)]
    struct Widget {
        id: Option<i64>,
        name: String,
        size: Option<i64>,
    }

    impl Entity for Widget {
        const NAME: &'static str = "Widget";
        const TABLE: &'static str = "widgets";
        const KEY: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["name", "size"];

        fn key(&self) -> Option<Value> {
            self.id.map(Value::from)
        }

        fn values(&self) -> Vec<Value> {
            vec![self.name.clone().into(), self.size.into()]
        }
    }

    fn widget(id: Option<i64>) -> Widget {
        Widget {
            id,
            name: "bolt".into(),
            size: None,
        }
    }

    #[test]
    fn test_select_everything() {
        let statement = select::<Widget>(RepositoryOperation::Get, None, None, Pagination::none())
            .unwrap();
        assert_eq!(statement.sql(), "SELECT * FROM widgets");
    }

    #[test]
    fn test_select_with_filter_order_and_window() {
        let filter = Filter::ne("name", "B").and(Filter::gt("size", 3).or(Filter::is_null("size")));
        let statement = select::<Widget>(
            RepositoryOperation::Get,
            Some(&filter),
            Some(&OrderBy::desc("id").then_asc("name")),
            Pagination::skip_take(0, 1),
        )
        .unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT * FROM widgets WHERE (name IS NOT ? AND (size > ? OR size IS NULL)) \
             ORDER BY id DESC, name ASC LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn test_pagination_windows() {
        let sql = |p| {
            select::<Widget>(RepositoryOperation::Get, None, None, p)
                .unwrap()
                .sql()
                .to_string()
        };
        assert_eq!(sql(Pagination::skip_only(2)), "SELECT * FROM widgets LIMIT -1 OFFSET ?");
        assert_eq!(sql(Pagination::take_only(2)), "SELECT * FROM widgets LIMIT ?");
    }

    #[test]
    fn test_in_and_not() {
        let filter = Filter::is_in("id", vec![1_i64, 2, 3]).negate();
        let statement =
            select::<Widget>(RepositoryOperation::Get, Some(&filter), None, Pagination::none())
                .unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT * FROM widgets WHERE NOT COALESCE((id IN (?, ?, ?)), 0)"
        );

        let empty = Filter::is_in("id", Vec::<i64>::new());
        let statement = count::<Widget>(RepositoryOperation::Count, Some(&empty)).unwrap();
        assert_eq!(statement.sql(), "SELECT COUNT(*) FROM widgets WHERE 1 = 0");
    }

    #[test]
    fn test_empty_groups() {
        let statement =
            count::<Widget>(RepositoryOperation::Count, Some(&Filter::any(vec![]))).unwrap();
        assert_eq!(statement.sql(), "SELECT COUNT(*) FROM widgets WHERE 1 = 0");
        let statement =
            count::<Widget>(RepositoryOperation::Count, Some(&Filter::all(vec![]))).unwrap();
        assert_eq!(statement.sql(), "SELECT COUNT(*) FROM widgets WHERE 1 = 1");
    }

    #[test]
    fn test_equality_with_null_becomes_is_null() {
        let filter = Filter::eq("size", Value::Null);
        let statement = count::<Widget>(RepositoryOperation::Count, Some(&filter)).unwrap();
        assert_eq!(statement.sql(), "SELECT COUNT(*) FROM widgets WHERE size IS NULL");
    }

    #[test]
    fn test_negations_keep_null_fields() {
        let statement = count::<Widget>(
            RepositoryOperation::Count,
            Some(&Filter::ne("size", 3)),
        )
        .unwrap();
        assert_eq!(statement.sql(), "SELECT COUNT(*) FROM widgets WHERE size IS NOT ?");

        let statement = count::<Widget>(
            RepositoryOperation::Count,
            Some(&Filter::gt("size", 3).negate()),
        )
        .unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT COUNT(*) FROM widgets WHERE NOT COALESCE((size > ?), 0)"
        );
    }

    #[test]
    fn test_unknown_order_field_rejected() {
        let Err(err) = select::<Widget>(
            RepositoryOperation::Get,
            None,
            Some(&OrderBy::asc("colour")),
            Pagination::none(),
        ) else {
            panic!("expected InvalidArgument");
        };
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
    }

    #[test]
    fn test_insert_omits_missing_key() {
        let statement = insert(RepositoryOperation::Create, &widget(None)).unwrap();
        assert_eq!(
            statement.sql(),
            "INSERT INTO widgets (name, size) VALUES (?, ?) RETURNING *"
        );

        let statement = insert(RepositoryOperation::Create, &widget(Some(9))).unwrap();
        assert_eq!(
            statement.sql(),
            "INSERT INTO widgets (id, name, size) VALUES (?, ?, ?) RETURNING *"
        );
    }

    #[test]
    fn test_update_requires_key() {
        let Err(err) = update(RepositoryOperation::Update, &widget(None)) else {
            panic!("expected InvalidArgument");
        };
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(err.entity_type.as_deref(), Some("Widget"));

        let statement = update(RepositoryOperation::Update, &widget(Some(4))).unwrap();
        assert_eq!(
            statement.sql(),
            "UPDATE widgets SET name = ?, size = ? WHERE id = ?"
        );
    }
}
