//! Scalar values as they come off a cursor.

use std::fmt;

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// One raw row: scalar values in column order.
pub type Row = Vec<SqlValue>;

/// A single scalar bound as a parameter or read from a result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SqlValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Real(v) => Some(*v),
            SqlValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(v) => Some(v),
            SqlValue::Text(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    /// Storage class name, as SQLite reports it.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Integer(_) => "integer",
            SqlValue::Real(_) => "real",
            SqlValue::Text(_) => "text",
            SqlValue::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(v) => write!(f, "{v}"),
            SqlValue::Real(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "{v}"),
            SqlValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            SqlValue::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(v) => SqlValue::Integer(v),
            ValueRef::Real(v) => SqlValue::Real(v),
            // SQLite does not enforce encodings; keep invalid text byte-exact.
            ValueRef::Text(v) => match std::str::from_utf8(v) {
                Ok(text) => SqlValue::Text(text.to_string()),
                Err(_) => SqlValue::Blob(v.to_vec()),
            },
            ValueRef::Blob(v) => SqlValue::Blob(v.to_vec()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Blob(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Column metadata reported by a cursor after execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    /// Raw column name as the driver reports it.
    pub name: String,
    /// Declared type, when the column maps straight onto a table column.
    pub decl_type: Option<String>,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, decl_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            decl_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_none_to_null() {
        let v: SqlValue = Option::<i64>::None.into();
        assert!(v.is_null());
        let v: SqlValue = Some("x").into();
        assert_eq!(v.as_str(), Some("x"));
    }

    #[test]
    fn untagged_json_shape() {
        let row: Row = vec![1i64.into(), "a".into(), SqlValue::Null];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[1,"a",null]"#);
    }

    #[test]
    fn invalid_utf8_text_stays_bytes() {
        let bytes = [0x66, 0xff, 0x6f];
        assert_eq!(SqlValue::from(ValueRef::Text(&bytes)), SqlValue::Blob(bytes.to_vec()));
        assert_eq!(SqlValue::from(ValueRef::Text(b"ok")), SqlValue::Text("ok".into()));
    }

    #[test]
    fn integer_widens_to_real() {
        assert_eq!(SqlValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(SqlValue::Text("3".into()).as_f64(), None);
    }
}
