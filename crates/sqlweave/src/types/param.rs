//! Bound parameter values and placeholder syntax.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text parameter.
    Text(String),
    /// Integer parameter.
    Integer(i64),
    /// Floating point parameter.
    Float(f64),
    /// Boolean parameter.
    Bool(bool),
    /// Timestamp parameter.
    Timestamp(DateTime<Utc>),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a text parameter.
    pub fn text(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }

    /// Returns true if the value carries no criterion.
    ///
    /// Null and blank text are empty. Numbers, booleans and timestamps never
    /// are, so `0` and `false` still produce a clause.
    pub fn is_empty(&self) -> bool {
        match self {
            SqlParam::Null => true,
            SqlParam::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the text if this is a text parameter.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlParam::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the parameter to JSON, for logging and display.
    pub fn to_json(&self) -> Value {
        match self {
            SqlParam::Text(s) => Value::String(s.clone()),
            SqlParam::Integer(i) => Value::from(*i),
            SqlParam::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlParam::Bool(b) => Value::Bool(*b),
            SqlParam::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            SqlParam::Null => Value::Null,
        }
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<&String> for SqlParam {
    fn from(value: &String) -> Self {
        SqlParam::Text(value.clone())
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Integer(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Integer(value.into())
    }
}

impl From<u32> for SqlParam {
    fn from(value: u32) -> Self {
        SqlParam::Integer(value.into())
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(value: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Positional placeholder syntax expected by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placeholder {
    /// `$1, $2, ...` (PostgreSQL).
    #[default]
    Dollar,
    /// `?1, ?2, ...` (SQLite).
    Question,
}

impl Placeholder {
    /// Renders the placeholder for a 1-based parameter index.
    pub fn render(self, index: usize) -> String {
        match self {
            Placeholder::Dollar => format!("${}", index),
            Placeholder::Question => format!("?{}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(SqlParam::Null.is_empty());
        assert!(SqlParam::text("").is_empty());
        assert!(SqlParam::text("   ").is_empty());
        assert!(!SqlParam::text("a").is_empty());
        assert!(!SqlParam::Integer(0).is_empty());
        assert!(!SqlParam::Bool(false).is_empty());
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<&str> = None;
        assert_eq!(SqlParam::from(none), SqlParam::Null);
        assert_eq!(SqlParam::from(Some(7i64)), SqlParam::Integer(7));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(SqlParam::text("red").to_json(), serde_json::json!("red"));
        assert_eq!(SqlParam::Integer(7).to_json(), serde_json::json!(7));
        assert_eq!(SqlParam::Float(f64::NAN).to_json(), Value::Null);
        assert_eq!(SqlParam::Null.to_json(), Value::Null);
    }

    #[test]
    fn test_placeholder_render() {
        assert_eq!(Placeholder::Dollar.render(3), "$3");
        assert_eq!(Placeholder::Question.render(12), "?12");
    }
}
