//! Projected rows.

use rawscroll_core::errors::{QueryError, QueryResult};
use rawscroll_core::types::SqlValue;
use serde::ser::{Serialize, SerializeMap, Serializer};

static NULL: SqlValue = SqlValue::Null;

/// One result row mapped onto a schema.
///
/// Loaded fields keep schema order. Fields whose column was absent from the
/// query are deferred: reading them is an error, not a NULL. Result columns
/// the schema does not know about ride along as annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: String,
    db: String,
    primary_key: String,
    fields: Vec<(String, SqlValue)>,
    deferred: Vec<String>,
    annotations: Vec<(String, SqlValue)>,
}

impl Record {
    pub(crate) fn new(
        schema: &str,
        db: &str,
        primary_key: &str,
        fields: Vec<(String, SqlValue)>,
        deferred: Vec<String>,
    ) -> Self {
        Self {
            schema: schema.to_string(),
            db: db.to_string(),
            primary_key: primary_key.to_string(),
            fields,
            deferred,
            annotations: Vec::new(),
        }
    }

    pub(crate) fn annotate(&mut self, name: String, value: SqlValue) {
        self.annotations.push((name, value));
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Alias the record was read from.
    pub fn db(&self) -> &str {
        &self.db
    }

    /// Primary key value. Always loaded.
    pub fn pk(&self) -> &SqlValue {
        self.fields
            .iter()
            .find(|(name, _)| *name == self.primary_key)
            .map(|(_, value)| value)
            .unwrap_or(&NULL)
    }

    /// A field, or failing that an annotation.
    pub fn get(&self, name: &str) -> QueryResult<&SqlValue> {
        if let Some((_, value)) = self.fields.iter().find(|(n, _)| n == name) {
            return Ok(value);
        }
        if self.is_deferred(name) {
            return Err(QueryError::DeferredField {
                field: name.to_string(),
            });
        }
        self.annotation(name).ok_or_else(|| QueryError::UnknownField {
            field: name.to_string(),
        })
    }

    pub fn annotation(&self, name: &str) -> Option<&SqlValue> {
        self.annotations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn annotations(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.annotations.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn deferred_fields(&self) -> &[String] {
        &self.deferred
    }

    pub fn is_deferred(&self, name: &str) -> bool {
        self.deferred.iter().any(|d| d == name)
    }

    /// True when at least one schema field was not loaded.
    pub fn is_partial(&self) -> bool {
        !self.deferred.is_empty()
    }
}

/// Loaded fields then annotations, as one map. Deferred fields are left out.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.annotations.len()))?;
        for (name, value) in self.fields.iter().chain(self.annotations.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
