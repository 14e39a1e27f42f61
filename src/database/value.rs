use serde_json::Value;
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;

/// A bindable column value. Each variant carries its own SQL type so that a
/// NULL is still sent with the right parameter type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            SqlValue::Int(None) | SqlValue::Float(None) | SqlValue::Text(None)
        )
    }

    /// Scalar JSON to a bind value. Arrays and objects have no column
    /// representation and yield `None`.
    pub fn from_json(value: &Value) -> Option<SqlValue> {
        match value {
            Value::Null => Some(SqlValue::Text(None)),
            Value::Bool(b) => Some(SqlValue::Int(Some(*b as i64))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(SqlValue::Int(Some(i)))
                } else if let Some(u) = n.as_u64() {
                    // No unsigned 64-bit column type; clamp into i64
                    Some(SqlValue::Int(Some(i64::try_from(u).unwrap_or(i64::MAX))))
                } else {
                    n.as_f64().map(|f| SqlValue::Float(Some(f)))
                }
            }
            Value::String(s) => Some(SqlValue::Text(Some(s.clone()))),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Int(Some(v as i64))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(Some(v))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(Some(v.clone()))
    }
}

impl From<&Option<String>> for SqlValue {
    fn from(v: &Option<String>) -> Self {
        SqlValue::Text(v.clone())
    }
}

pub(crate) fn bind_param<'q>(
    q: Query<'q, Any, AnyArguments<'q>>,
    v: &SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match v {
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.clone()),
    }
}

pub(crate) fn bind_all<'q>(
    mut q: Query<'q, Any, AnyArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

/// `$1, $2, ...` starting after `offset` existing parameters
pub(crate) fn placeholders(count: usize, offset: usize) -> String {
    (1..=count)
        .map(|i| format!("${}", i + offset))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_json_maps_to_typed_values() {
        assert_eq!(SqlValue::from_json(&json!(42)), Some(SqlValue::Int(Some(42))));
        assert_eq!(SqlValue::from_json(&json!(true)), Some(SqlValue::Int(Some(1))));
        assert_eq!(SqlValue::from_json(&json!(1.5)), Some(SqlValue::Float(Some(1.5))));
        assert_eq!(
            SqlValue::from_json(&json!("x")),
            Some(SqlValue::Text(Some("x".to_string())))
        );
        assert!(SqlValue::from_json(&json!(null)).map(|v| v.is_null()).unwrap_or(false));
        assert_eq!(SqlValue::from_json(&json!([1, 2])), None);
        assert_eq!(SqlValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn placeholders_continue_numbering() {
        assert_eq!(placeholders(3, 0), "$1, $2, $3");
        assert_eq!(placeholders(2, 4), "$5, $6");
        assert_eq!(placeholders(0, 0), "");
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
