//! Filter predicates for repository queries
//!
//! A [`Filter`] is plain data: a tree of field comparisons joined by
//! `and`/`or`/`not`. It is validated against the entity's declared columns and
//! compiled into a parameter-bound `WHERE` clause; operands are never spliced
//! into SQL text.
//!
//! # Example
//!
//! ```rust
//! use entity_repo::repository::Filter;
//!
//! // name != 'B' AND (age >= 18 OR guardian IS NOT NULL)
//! let filter = Filter::ne("name", "B")
//!     .and(Filter::gte("age", 18).or(Filter::is_not_null("guardian")));
//!
//! let fields: Vec<&str> = filter.fields().collect();
//! assert_eq!(fields, vec!["name", "age", "guardian"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::RepositoryResult;
use super::value::Value;

/// Comparison operators for filter conditions
///
/// # Example
///
/// ```rust
/// use entity_repo::repository::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: Value,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Check that the operand fits the operator
    ///
    /// Lists only make sense for `IN`, `LIKE` needs a string pattern and
    /// ordering comparisons against `NULL` never match anything.
    pub(crate) fn validate(&self, operation: RepositoryOperation) -> RepositoryResult<()> {
        let invalid = |reason: &str| {
            Err(RepositoryError::invalid_argument(
                operation,
                format!(
                    "filter on '{}' with {} {}: {}",
                    self.field,
                    self.operator,
                    self.value.type_name(),
                    reason
                ),
            ))
        };
        match self.operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull | FilterOperator::In => Ok(()),
            _ if self.value.is_list() => invalid("list operands require the IN operator"),
            FilterOperator::Like if !matches!(self.value, Value::String(_)) => {
                invalid("LIKE requires a string pattern")
            }
            FilterOperator::GreaterThan
            | FilterOperator::GreaterThanOrEqual
            | FilterOperator::LessThan
            | FilterOperator::LessThanOrEqual
                if self.value.is_null() =>
            {
                invalid("ordering comparisons against null are undefined")
            }
            _ => Ok(()),
        }
    }
}

/// Predicate tree over an entity's fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// A single comparison
    Condition(FilterCondition),
    /// Every child must match; an empty list matches everything
    And(Vec<Filter>),
    /// Any child must match; an empty list matches nothing
    Or(Vec<Filter>),
    /// Negation of the child
    Not(Box<Filter>),
}

impl Filter {
    /// `field = value` (`IS NULL` when the value is null)
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::Equal, value).into()
    }

    /// `field != value`, matching rows where the field is null
    /// (`IS NOT NULL` when the value is null)
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::NotEqual, value).into()
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::GreaterThan, value).into()
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::GreaterThanOrEqual, value).into()
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::LessThan, value).into()
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::LessThanOrEqual, value).into()
    }

    /// `field LIKE pattern`
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterCondition::new(field, FilterOperator::Like, pattern.into()).into()
    }

    /// `field IN (values...)`
    pub fn is_in(field: impl Into<String>, values: impl Into<Value>) -> Self {
        FilterCondition::new(field, FilterOperator::In, values).into()
    }

    /// `field IS NULL`
    pub fn is_null(field: impl Into<String>) -> Self {
        FilterCondition::new(field, FilterOperator::IsNull, Value::Null).into()
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: impl Into<String>) -> Self {
        FilterCondition::new(field, FilterOperator::IsNotNull, Value::Null).into()
    }

    /// Conjunction of every filter in `filters`
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// Disjunction of every filter in `filters`
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// `self AND other`, flattening nested conjunctions
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// `self OR other`, flattening nested disjunctions
    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// `NOT self`
    ///
    /// A row for which `self` is unknown because of a null field is kept.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Every field name referenced by the tree, depth first
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out.into_iter().map(|c| c.field.as_str())
    }

    /// Every comparison in the tree, depth first
    pub fn conditions(&self) -> Vec<&FilterCondition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a FilterCondition>) {
        match self {
            Self::Condition(condition) => out.push(condition),
            Self::And(parts) | Self::Or(parts) => {
                for part in parts {
                    part.collect_conditions(out);
                }
            }
            Self::Not(inner) => inner.collect_conditions(out),
        }
    }

    /// Reject unknown fields and operand/operator mismatches
    pub(crate) fn validate(
        &self,
        operation: RepositoryOperation,
        entity: &str,
        is_column: impl Fn(&str) -> bool,
    ) -> RepositoryResult<()> {
        for condition in self.conditions() {
            if !is_column(condition.field.as_str()) {
                return Err(RepositoryError::invalid_argument(
                    operation,
                    format!("unknown field '{}' in filter", condition.field),
                )
                .with_entity_type(entity));
            }
            condition
                .validate(operation)
                .map_err(|e| e.with_entity_type(entity))?;
        }
        Ok(())
    }
}

impl From<FilterCondition> for Filter {
    fn from(condition: FilterCondition) -> Self {
        Self::Condition(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(field: &str) -> bool {
        matches!(field, "id" | "name" | "age")
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::GreaterThanOrEqual), ">=");
        assert_eq!(format!("{}", FilterOperator::In), "IN");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_and_flattens() {
        let filter = Filter::eq("id", 1).and(Filter::eq("name", "a")).and(Filter::gt("age", 3));
        match filter {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_or_does_not_merge_into_and() {
        let filter = Filter::eq("id", 1).and(Filter::eq("id", 2)).or(Filter::eq("id", 3));
        match filter {
            Filter::Or(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(parts[0], Filter::And(_)));
            }
            other => panic!("expected disjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_double_negation_cancels() {
        let filter = Filter::eq("name", "B");
        assert_eq!(filter.clone().negate().negate(), filter);
    }

    #[test]
    fn test_validate_rejects_unknown_field() {
        let err = Filter::eq("email", "x")
            .validate(RepositoryOperation::Get, "User", columns)
            .unwrap_err();
        assert_eq!(err.kind, crate::repository::RepositoryErrorKind::InvalidArgument);
        assert!(err.message.contains("email"));
        assert_eq!(err.entity_type.as_deref(), Some("User"));
    }

    #[test]
    fn test_validate_operand_shapes() {
        let ok = Filter::is_in("id", vec![1_i64, 2]).and(Filter::like("name", "A%"));
        assert!(ok.validate(RepositoryOperation::Get, "User", columns).is_ok());

        let list_eq = Filter::eq("id", vec![1_i64, 2]);
        assert!(list_eq.validate(RepositoryOperation::Get, "User", columns).is_err());

        let like_int = Filter::from(FilterCondition::new("age", FilterOperator::Like, 3));
        assert!(like_int.validate(RepositoryOperation::Get, "User", columns).is_err());

        let gt_null = Filter::gt("age", Value::Null);
        assert!(gt_null.validate(RepositoryOperation::Count, "User", columns).is_err());
    }

    #[test]
    fn test_filter_is_serializable_data() {
        let filter = Filter::ne("name", "B").and(Filter::is_null("age").negate());
        let json = serde_json::to_string(&filter).unwrap();
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
    }
}
