//! `RawQuery`: a lazily executed SQL statement with random row access.
//!
//! The primary cursor moves through three states: unopened, open at some
//! offset, and closed. Every public read goes forward from offset 0 and
//! rewinds to offset 0 before returning, on success and on error, so repeated
//! reads never drift. The offset is tracked here as well as in the driver.

use std::fmt;

use rawscroll_core::constants::COUNT_SUBQUERY_ALIAS;
use rawscroll_core::errors::{QueryError, QueryResult, StorageError, StorageResult};
use rawscroll_core::types::{Row, SqlValue};
use tracing::{debug, trace, warn};

use super::slice::RowSlice;
use crate::backend::{subquery_body, ConnectionHandle, Cursor, ScrollMode};
use crate::connection::Connections;

/// Observable state of the primary cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unopened,
    Open { offset: usize },
    Closed,
}

struct OpenCursor {
    handle: ConnectionHandle,
    cursor: Box<dyn Cursor>,
    offset: usize,
}

impl OpenCursor {
    fn forward(&mut self, rows: usize) -> StorageResult<()> {
        if rows == 0 {
            return Ok(());
        }
        let value = i64::try_from(rows).unwrap_or(i64::MAX);
        self.cursor.scroll(value, ScrollMode::Relative)?;
        self.offset += rows;
        Ok(())
    }

    fn fetch_one(&mut self) -> StorageResult<Option<Row>> {
        let row = self.cursor.fetch_one()?;
        if row.is_some() {
            self.offset += 1;
        }
        Ok(row)
    }

    fn fetch_many(&mut self, size: usize) -> StorageResult<Vec<Row>> {
        let rows = self.cursor.fetch_many(size)?;
        self.offset += rows.len();
        Ok(rows)
    }

    fn rewind(&mut self) -> StorageResult<()> {
        debug_assert_eq!(
            self.cursor.row_number(),
            self.offset,
            "driver position disagrees with the tracked offset"
        );
        if self.offset != 0 {
            self.cursor.scroll(0, ScrollMode::Absolute)?;
            self.offset = 0;
        }
        Ok(())
    }
}

enum Primary {
    Unopened,
    Open(OpenCursor),
    Closed,
}

/// A raw SQL statement bound to an alias of one thread's registry.
///
/// Nothing touches the database until the first read.
pub struct RawQuery {
    sql: String,
    params: Vec<SqlValue>,
    alias: String,
    connections: Connections,
    max_extent: u64,
    primary: Primary,
    counter: Option<Box<dyn Cursor>>,
    columns: Option<Vec<String>>,
    cached_count: Option<u64>,
}

impl RawQuery {
    /// A query on the default alias with no parameters.
    pub fn new(connections: &Connections, sql: impl Into<String>) -> Self {
        let handler = connections.handler();
        Self {
            sql: sql.into(),
            params: Vec::new(),
            alias: handler.default_alias().to_string(),
            connections: connections.clone(),
            max_extent: handler.config().paging.max_extent(),
            primary: Primary::Unopened,
            counter: None,
            columns: None,
            cached_count: None,
        }
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = SqlValue>) -> Self {
        self.params = params.into_iter().collect();
        self
    }

    pub fn using(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Override the cap used for open-ended slices and the count probe.
    pub fn with_max_extent(mut self, max_extent: u64) -> Self {
        self.max_extent = max_extent;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn max_extent(&self) -> u64 {
        self.max_extent
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub fn state(&self) -> CursorState {
        match &self.primary {
            Primary::Unopened => CursorState::Unopened,
            Primary::Open(open) => CursorState::Open {
                offset: open.offset,
            },
            Primary::Closed => CursorState::Closed,
        }
    }

    /// Offset of the primary cursor, if it is open.
    pub fn position(&self) -> Option<usize> {
        match self.state() {
            CursorState::Open { offset } => Some(offset),
            _ => None,
        }
    }

    /// Open the primary cursor and run the statement. Runs at most once per
    /// query; later calls are no-ops.
    pub fn execute(&mut self) -> QueryResult<()> {
        match self.primary {
            Primary::Open(_) => Ok(()),
            Primary::Closed => Err(QueryError::QueryClosed),
            Primary::Unopened => {
                let handle = self.connections.get(&self.alias)?;
                let mut cursor = handle.cursor()?;
                cursor.execute(&self.sql, &self.params)?;
                debug!(alias = %self.alias, sql = %self.sql, params = self.params.len(), "raw query executed");
                self.primary = Primary::Open(OpenCursor {
                    handle,
                    cursor,
                    offset: 0,
                });
                Ok(())
            }
        }
    }

    fn open_cursor(&mut self) -> QueryResult<&mut OpenCursor> {
        self.execute()?;
        match &mut self.primary {
            Primary::Open(open) => Ok(open),
            _ => Err(QueryError::QueryClosed),
        }
    }

    /// Run `f` against the primary cursor, then rewind to offset 0 whatever
    /// `f` returned.
    fn read<T>(&mut self, f: impl FnOnce(&mut OpenCursor) -> StorageResult<T>) -> QueryResult<T> {
        let open = self.open_cursor()?;
        let result = f(open);
        let rewound = open.rewind();
        let value = result?;
        rewound?;
        Ok(value)
    }

    /// Result column names, normalised by the backend. Computed once.
    pub fn columns(&mut self) -> QueryResult<&[String]> {
        if self.columns.is_none() {
            let names = self
                .resolve_columns()
                .map_err(|e| self.column_error(e.to_string()))?;
            self.columns = Some(names);
        }
        Ok(self.columns.as_deref().unwrap_or_default())
    }

    fn resolve_columns(&mut self) -> QueryResult<Vec<String>> {
        let open = self.open_cursor()?;
        let fetched = open.fetch_one()?.is_some();
        let names = match open.cursor.description() {
            Some(description) => description
                .iter()
                .map(|c| open.handle.normalize_identifier(&c.name))
                .collect(),
            None => {
                open.rewind()?;
                return Err(StorageError::sqlite("statement returns no columns").into());
            }
        };
        if fetched {
            if let Err(e) = open.cursor.scroll(-1, ScrollMode::Relative) {
                if let Err(rewind) = open.rewind() {
                    warn!(error = %rewind, "rewind after column lookup failed");
                }
                return Err(e.into());
            }
            open.offset -= 1;
        }
        Ok(names)
    }

    fn column_error(&self, message: String) -> QueryError {
        QueryError::ColumnResolution {
            alias: self.alias.clone(),
            sql: self.sql.clone(),
            message,
        }
    }

    /// The row at `index`, or `None` past the end of the result.
    pub fn get(&mut self, index: i64) -> QueryResult<Option<Row>> {
        let Ok(index) = usize::try_from(index) else {
            return Err(QueryError::UnsupportedIndex {
                index: index.to_string(),
            });
        };
        trace!(alias = %self.alias, index, "raw query get");
        self.read(|open| {
            match open.forward(index) {
                Err(StorageError::ScrollOutOfRange { .. }) => return Ok(None),
                other => other?,
            }
            open.fetch_one()
        })
    }

    /// Rows in `[start, stop)`. Stops early when the result runs out.
    pub fn slice(&mut self, slice: impl Into<RowSlice>) -> QueryResult<Vec<Row>> {
        let slice = slice.into();
        slice.validate()?;
        let (start, stop) = slice.bounds(self.max_extent);
        trace!(alias = %self.alias, start, stop, "raw query slice");
        self.read(|open| {
            if stop <= start {
                return Ok(Vec::new());
            }
            match open.forward(start) {
                Err(StorageError::ScrollOutOfRange { .. }) => return Ok(Vec::new()),
                other => other?,
            }
            open.fetch_many(stop - start)
        })
    }

    /// Every row of the result. Unlike an open-ended slice this is not capped
    /// at the max extent.
    pub fn all(&mut self) -> QueryResult<Vec<Row>> {
        trace!(alias = %self.alias, "raw query all");
        self.read(|open| open.fetch_many(usize::MAX))
    }

    /// Whether the result holds a row at offset `extent`. Driver errors
    /// count as "no".
    pub fn probe(&mut self, extent: u64) -> QueryResult<bool> {
        let alias = self.alias.clone();
        self.read(|open| {
            let target = usize::try_from(extent).unwrap_or(usize::MAX);
            let found = open.forward(target).and_then(|()| open.fetch_one());
            match found {
                Ok(row) => Ok(row.is_some()),
                Err(StorageError::ScrollOutOfRange { .. }) => Ok(false),
                Err(e) => {
                    warn!(alias = %alias, extent, error = %e, "count probe failed, falling back to count(*)");
                    Ok(false)
                }
            }
        })
    }

    /// `SELECT count(*)` over this statement as a subquery.
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT count(*) FROM ({}) AS {COUNT_SUBQUERY_ALIAS}",
            subquery_body(&self.sql)
        )
    }

    /// A cursor on the same connection, separate from the primary one.
    pub fn counter_cursor(&mut self) -> QueryResult<&mut Box<dyn Cursor>> {
        if self.counter.as_ref().map_or(true, |c| c.is_closed()) {
            let handle = self.connections.get(&self.alias)?;
            self.counter = Some(handle.cursor()?);
        }
        self.counter.as_mut().ok_or(QueryError::QueryClosed)
    }

    /// Run the count query on the counter cursor. No row counts as 0.
    pub fn count_rows(&mut self) -> QueryResult<u64> {
        let sql = self.count_sql();
        let params = self.params.clone();
        let counter = self.counter_cursor()?;
        counter.execute(&sql, &params)?;
        let row = counter.fetch_one()?;
        if let Some(mut counter) = self.counter.take() {
            counter.close()?;
        }
        let count = row
            .and_then(|r| r.first().and_then(SqlValue::as_i64))
            .unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Row count capped at `max_extent`: the cap when a row exists at that
    /// offset, the exact count otherwise. Cached after the first call.
    pub fn bounded_count(&mut self) -> QueryResult<u64> {
        if let Some(count) = self.cached_count {
            return Ok(count);
        }
        let count = if self.probe(self.max_extent)? {
            self.max_extent
        } else {
            self.count_rows()?
        };
        debug!(alias = %self.alias, count, cap = self.max_extent, "row count resolved");
        self.cached_count = Some(count);
        Ok(count)
    }

    pub fn cached_count(&self) -> Option<u64> {
        self.cached_count
    }

    /// Close both cursors. The query cannot be read afterwards.
    pub fn close(&mut self) -> QueryResult<()> {
        let primary = std::mem::replace(&mut self.primary, Primary::Closed);
        if let Some(mut counter) = self.counter.take() {
            counter.close()?;
        }
        if let Primary::Open(mut open) = primary {
            open.cursor.close()?;
        }
        Ok(())
    }
}

impl fmt::Debug for RawQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawQuery")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("alias", &self.alias)
            .field("state", &self.state())
            .finish()
    }
}
