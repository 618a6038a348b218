//! `RawQuerySet`: a `RawQuery` whose rows come back as `Record`s.

use std::collections::BTreeMap;

use rawscroll_core::errors::{QueryError, QueryResult};
use rawscroll_core::types::{Row, SqlValue};
use serde::Serialize;
use tracing::debug;

use super::record::Record;
use super::schema::Schema;
use crate::query::{RawQuery, RowSlice};

/// How `RawQuerySet::count` sizes the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageCountMode {
    /// Probe at the max extent, falling back to `count(*)` below it.
    #[default]
    Exact,
    /// Report an unbounded result so every row lands on one page.
    All,
    /// Assume the max extent without touching the database.
    NoCount,
}

/// What `count` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum RowCount {
    /// No pagination math applies.
    Unbounded,
    /// At least this many rows; the real count was not taken.
    Capped(u64),
    Exact(u64),
}

impl RowCount {
    /// The number of rows, unless unbounded.
    pub fn as_u64(self) -> Option<u64> {
        match self {
            RowCount::Unbounded => None,
            RowCount::Capped(n) | RowCount::Exact(n) => Some(n),
        }
    }
}

/// Where each result column goes in a record.
enum Slot {
    Field(usize),
    Annotation(String),
}

struct Plan {
    schema: Schema,
    slots: Vec<Slot>,
    deferred: Vec<String>,
}

pub struct RawQuerySet {
    query: RawQuery,
    schema: Option<Schema>,
    translations: BTreeMap<String, String>,
    count_mode: PageCountMode,
    plan: Option<Plan>,
}

impl RawQuerySet {
    /// Project onto a schema inferred from the result columns.
    pub fn new(query: RawQuery) -> Self {
        Self {
            query,
            schema: None,
            translations: BTreeMap::new(),
            count_mode: PageCountMode::default(),
            plan: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self.plan = None;
        self
    }

    /// Rename result columns before matching them against schema columns.
    pub fn with_translations<K, V>(mut self, translations: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.translations = translations
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.plan = None;
        self
    }

    pub fn with_count_mode(mut self, mode: PageCountMode) -> Self {
        self.count_mode = mode;
        self
    }

    pub fn query(&self) -> &RawQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut RawQuery {
        &mut self.query
    }

    pub fn into_query(self) -> RawQuery {
        self.query
    }

    pub fn count_mode(&self) -> PageCountMode {
        self.count_mode
    }

    pub fn db(&self) -> &str {
        self.query.alias()
    }

    /// Result column names after translation.
    pub fn columns(&mut self) -> QueryResult<Vec<String>> {
        let translations = &self.translations;
        Ok(self
            .query
            .columns()?
            .iter()
            .map(|c| translations.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect())
    }

    /// The schema records are built against, once the columns are known.
    pub fn schema(&mut self) -> QueryResult<&Schema> {
        Ok(&self.plan()?.schema)
    }

    fn plan(&mut self) -> QueryResult<&Plan> {
        if self.plan.is_none() {
            let plan = self.build_plan()?;
            self.plan = Some(plan);
        }
        self.plan.as_ref().ok_or(QueryError::QueryClosed)
    }

    fn build_plan(&mut self) -> QueryResult<Plan> {
        let columns = self.columns()?;
        let schema = match &self.schema {
            Some(schema) => schema.clone(),
            None => Schema::infer(&columns),
        };
        let slots: Vec<Slot> = columns
            .into_iter()
            .map(|c| match schema.position_of_column(&c) {
                Some(i) => Slot::Field(i),
                None => Slot::Annotation(c),
            })
            .collect();
        let loaded = |i: usize| slots.iter().any(|s| matches!(s, Slot::Field(f) if *f == i));
        let pk_loaded = schema
            .fields()
            .iter()
            .position(|f| f.name == schema.primary_key())
            .is_some_and(loaded);
        if !pk_loaded {
            return Err(QueryError::InvalidQuery {
                alias: self.query.alias().to_string(),
                sql: self.query.sql().to_string(),
                message: format!(
                    "raw query must include the primary key '{}'",
                    schema.primary_key()
                ),
            });
        }
        let deferred: Vec<String> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| !loaded(*i))
            .map(|(_, f)| f.name.clone())
            .collect();
        debug!(
            schema = schema.name(),
            columns = slots.len(),
            deferred = deferred.len(),
            "raw projection planned"
        );
        Ok(Plan {
            schema,
            slots,
            deferred,
        })
    }

    fn project(&self, plan: &Plan, row: Row) -> QueryResult<Record> {
        let fields = plan.schema.fields();
        let mut values: Vec<Option<SqlValue>> = vec![None; fields.len()];
        let mut annotations = Vec::new();
        for (slot, value) in plan.slots.iter().zip(row) {
            match slot {
                Slot::Field(i) => {
                    let field = &fields[*i];
                    values[*i] = Some(field.kind.coerce(&field.name, value)?);
                }
                Slot::Annotation(name) => annotations.push((name.clone(), value)),
            }
        }
        let loaded = fields
            .iter()
            .zip(values)
            .filter_map(|(f, v)| v.map(|v| (f.name.clone(), v)))
            .collect();
        let mut record = Record::new(
            plan.schema.name(),
            self.query.alias(),
            plan.schema.primary_key(),
            loaded,
            plan.deferred.clone(),
        );
        for (name, value) in annotations {
            record.annotate(name, value);
        }
        Ok(record)
    }

    /// The record at `index`, or `None` past the end.
    pub fn get(&mut self, index: i64) -> QueryResult<Option<Record>> {
        if index < 0 {
            return Err(QueryError::UnsupportedIndex {
                index: index.to_string(),
            });
        }
        self.plan()?;
        let Some(row) = self.query.get(index)? else {
            return Ok(None);
        };
        let plan = self.plan.as_ref().ok_or(QueryError::QueryClosed)?;
        self.project(plan, row).map(Some)
    }

    /// Records in a row range.
    pub fn slice(&mut self, slice: impl Into<RowSlice>) -> QueryResult<Vec<Record>> {
        let slice = slice.into();
        slice.validate()?;
        self.plan()?;
        let rows = self.query.slice(slice)?;
        let plan = self.plan.as_ref().ok_or(QueryError::QueryClosed)?;
        rows.into_iter().map(|row| self.project(plan, row)).collect()
    }

    /// Every record of the result, past the max extent too.
    pub fn all(&mut self) -> QueryResult<Vec<Record>> {
        self.plan()?;
        let rows = self.query.all()?;
        let plan = self.plan.as_ref().ok_or(QueryError::QueryClosed)?;
        rows.into_iter().map(|row| self.project(plan, row)).collect()
    }

    /// Size the result according to the count mode. Only `Exact` runs SQL.
    pub fn count(&mut self) -> QueryResult<RowCount> {
        let count = match self.count_mode {
            PageCountMode::All => RowCount::Unbounded,
            PageCountMode::NoCount => RowCount::Capped(self.query.max_extent()),
            PageCountMode::Exact => {
                let n = self.query.bounded_count()?;
                if n >= self.query.max_extent() {
                    RowCount::Capped(n)
                } else {
                    RowCount::Exact(n)
                }
            }
        };
        Ok(count)
    }
}

impl std::fmt::Debug for RawQuerySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawQuerySet")
            .field("query", &self.query)
            .field("schema", &self.schema.as_ref().map(Schema::name))
            .field("count_mode", &self.count_mode)
            .finish()
    }
}
