//! Record schemas: named fields, their source columns, and a primary key.

use rawscroll_core::errors::{QueryError, QueryResult};
use rawscroll_core::types::SqlValue;
use serde::{Deserialize, Serialize};

/// How a raw column value is coerced into a field value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Keep whatever the driver returned.
    #[default]
    Any,
    Integer,
    Real,
    Text,
    /// Stored as integer 0 or 1.
    Boolean,
    Blob,
}

impl FieldKind {
    /// Coerce `value` for `field`. NULL passes through every kind.
    pub fn coerce(self, field: &str, value: SqlValue) -> QueryResult<SqlValue> {
        let mismatch = |value: &SqlValue| QueryError::FieldConversion {
            field: field.to_string(),
            message: format!("cannot read {} value '{value}' as {self:?}", value.type_name()),
        };
        let coerced = match (self, value) {
            (_, SqlValue::Null) => SqlValue::Null,
            (FieldKind::Any, v) => v,

            (FieldKind::Integer, v @ SqlValue::Integer(_)) => v,
            (FieldKind::Integer, SqlValue::Real(r)) if r.fract() == 0.0 => SqlValue::Integer(r as i64),
            (FieldKind::Integer, SqlValue::Text(t)) => match t.trim().parse::<i64>() {
                Ok(i) => SqlValue::Integer(i),
                Err(_) => return Err(mismatch(&SqlValue::Text(t))),
            },

            (FieldKind::Real, v @ SqlValue::Real(_)) => v,
            (FieldKind::Real, SqlValue::Integer(i)) => SqlValue::Real(i as f64),
            (FieldKind::Real, SqlValue::Text(t)) => match t.trim().parse::<f64>() {
                Ok(r) => SqlValue::Real(r),
                Err(_) => return Err(mismatch(&SqlValue::Text(t))),
            },

            (FieldKind::Text, v @ SqlValue::Text(_)) => v,
            (FieldKind::Text, SqlValue::Integer(i)) => SqlValue::Text(i.to_string()),
            (FieldKind::Text, SqlValue::Real(r)) => SqlValue::Text(r.to_string()),
            (FieldKind::Text, SqlValue::Blob(b)) => match String::from_utf8(b) {
                Ok(s) => SqlValue::Text(s),
                Err(e) => return Err(mismatch(&SqlValue::Blob(e.into_bytes()))),
            },

            (FieldKind::Boolean, SqlValue::Integer(i)) => SqlValue::Integer(i64::from(i != 0)),
            (FieldKind::Boolean, SqlValue::Text(t)) => match t.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" => SqlValue::Integer(1),
                "0" | "f" | "false" => SqlValue::Integer(0),
                _ => return Err(mismatch(&SqlValue::Text(t))),
            },

            (FieldKind::Blob, v @ SqlValue::Blob(_)) => v,
            (FieldKind::Blob, SqlValue::Text(t)) => SqlValue::Blob(t.into_bytes()),

            (_, v) => return Err(mismatch(&v)),
        };
        Ok(coerced)
    }
}

/// One schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Result column the field is read from.
    pub column: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    primary_key: String,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            primary_key: None,
        }
    }

    /// The generic schema for a result: one untyped field per column. The
    /// primary key is the `id` column when there is one, else the first
    /// column.
    pub fn infer(columns: &[String]) -> Self {
        let primary_key = columns
            .iter()
            .find(|c| c.as_str() == "id")
            .or_else(|| columns.first())
            .cloned()
            .unwrap_or_else(|| "id".to_string());
        Self {
            name: "raw".to_string(),
            fields: columns
                .iter()
                .map(|c| Field {
                    name: c.clone(),
                    column: c.clone(),
                    kind: FieldKind::Any,
                })
                .collect(),
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Index of the field read from `column`.
    pub fn position_of_column(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.column == column)
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
    primary_key: Option<String>,
}

impl SchemaBuilder {
    /// Add a field read from the column of the same name.
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let column = name.clone();
        self.column_field(name, column, kind)
    }

    /// Add a field read from a differently named column.
    pub fn column_field(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        self.fields.push(Field {
            name: name.into(),
            column: column.into(),
            kind,
        });
        self
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    /// Without an explicit primary key, `id` is used if declared, else the
    /// first field.
    pub fn build(self) -> QueryResult<Schema> {
        let primary_key = match self.primary_key {
            Some(pk) => pk,
            None => self
                .fields
                .iter()
                .find(|f| f.name == "id")
                .or_else(|| self.fields.first())
                .map(|f| f.name.clone())
                .unwrap_or_else(|| "id".to_string()),
        };
        if !self.fields.iter().any(|f| f.name == primary_key) {
            return Err(QueryError::UnknownField { field: primary_key });
        }
        Ok(Schema {
            name: self.name,
            fields: self.fields,
            primary_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_prefers_id_column() {
        let columns = vec!["name".to_string(), "id".to_string()];
        let schema = Schema::infer(&columns);
        assert_eq!(schema.primary_key(), "id");
        assert_eq!(schema.fields().len(), 2);

        let schema = Schema::infer(&["slug".to_string(), "title".to_string()]);
        assert_eq!(schema.primary_key(), "slug");
    }

    #[test]
    fn builder_rejects_unknown_primary_key() {
        let err = Schema::builder("person")
            .field("name", FieldKind::Text)
            .primary_key("pk")
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { field } if field == "pk"));
    }

    #[test]
    fn builder_maps_columns() {
        let schema = Schema::builder("person")
            .field("id", FieldKind::Integer)
            .column_field("first_name", "first", FieldKind::Text)
            .build()
            .unwrap();
        assert_eq!(schema.primary_key(), "id");
        assert_eq!(schema.position_of_column("first"), Some(1));
        assert_eq!(schema.position_of_column("first_name"), None);
    }

    #[test]
    fn coercion_by_kind() {
        assert_eq!(
            FieldKind::Integer.coerce("n", SqlValue::Text(" 42 ".into())).unwrap(),
            SqlValue::Integer(42)
        );
        assert_eq!(
            FieldKind::Real.coerce("n", SqlValue::Integer(2)).unwrap(),
            SqlValue::Real(2.0)
        );
        assert_eq!(
            FieldKind::Boolean.coerce("b", SqlValue::Integer(7)).unwrap(),
            SqlValue::Integer(1)
        );
        assert_eq!(
            FieldKind::Text.coerce("t", SqlValue::Null).unwrap(),
            SqlValue::Null
        );
        assert!(matches!(
            FieldKind::Integer.coerce("n", SqlValue::Text("abc".into())),
            Err(QueryError::FieldConversion { field, .. }) if field == "n"
        ));
        assert!(FieldKind::Blob.coerce("b", SqlValue::Real(1.5)).is_err());
    }
}
