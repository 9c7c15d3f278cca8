//! Owned values exchanged with the store
//!
//! [`Value`] is the one currency for filter operands, entity column values
//! and raw-query parameters, so callers never touch `sqlx` argument types.
//!
//! # Example
//!
//! ```rust
//! use entity_repo::repository::Value;
//!
//! let name: Value = "Ada".into();
//! let age: Value = 36_i64.into();
//! let missing: Value = Option::<String>::None.into();
//!
//! assert_eq!(name, Value::String("Ada".to_string()));
//! assert_eq!(age, Value::Integer(36));
//! assert!(missing.is_null());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar or list value
///
/// List variants are only meaningful as the operand of an `IN` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// Null value
    Null,
}

impl Value {
    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this is one of the list variants
    pub fn is_list(&self) -> bool {
        matches!(self, Self::StringList(_) | Self::IntegerList(_))
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::StringList(_) => "string_list",
            Self::IntegerList(_) => "integer_list",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::StringList(items) => write!(f, "[{}]", items.join(", ")),
            Self::IntegerList(items) => {
                let rendered: Vec<String> = items.iter().map(i64::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<&str>> for Value {
    fn from(list: Vec<&str>) -> Self {
        Self::StringList(list.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for Value {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(7_i32), Value::Integer(7));
        assert_eq!(Value::from(2.5_f64), Value::Float(2.5));
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::StringList(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_list_detection() {
        assert!(Value::from(vec![1_i64, 2]).is_list());
        assert!(!Value::from("a").is_list());
        assert_eq!(Value::IntegerList(vec![]).type_name(), "integer_list");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec![1_i64, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_serde_is_tagged() {
        let json = serde_json::to_string(&Value::Integer(3)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":3}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Integer(3));
    }
}
