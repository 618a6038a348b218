//! Server-side cursor for SQLite.
//!
//! SQLite has no named scrollable cursors, so a read-only query is kept as
//! its statement and a position and answered one window at a time:
//! `SELECT * FROM (<sql>) LIMIT n OFFSET pos`. Only the rows of the current
//! fetch are held in memory. Executing a windowed query pins a read snapshot
//! on the connection (a savepoint) that lasts until the cursor is closed, so
//! every window sees the data as it was at execute time. A forward scroll is
//! checked by asking for the single row just before the destination.
//!
//! Statements that write, or that cannot be nested as a subquery (PRAGMA,
//! `INSERT ... RETURNING`), run once at execute time and are served from
//! memory.

use std::rc::Rc;

use rawscroll_core::errors::{StorageError, StorageResult};
use rawscroll_core::types::{ColumnDescription, Row, SqlValue};
use tracing::debug;

use super::{collect_rows, describe, scroll_target, SqliteSession};
use crate::backend::{subquery_body, Cursor, ScrollMode};

/// Leading keywords of statements that can be wrapped as a subquery.
const WINDOWED_KEYWORDS: [&str; 3] = ["SELECT", "VALUES", "WITH"];

enum Source {
    Windowed { body: String, snapshot: String },
    Materialized(Vec<Row>),
}

fn windowable(body: &str, stmt: &rusqlite::Statement<'_>) -> bool {
    let keyword = body
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    stmt.readonly() && stmt.column_count() > 0 && WINDOWED_KEYWORDS.contains(&keyword.as_str())
}

pub struct ServerSideCursor {
    session: Rc<SqliteSession>,
    source: Option<Source>,
    params: Vec<SqlValue>,
    description: Option<Vec<ColumnDescription>>,
    position: usize,
    /// Row count, once a short fetch has revealed it.
    known_len: Option<usize>,
    executed: bool,
    closed: bool,
}

impl ServerSideCursor {
    pub(crate) fn new(session: Rc<SqliteSession>) -> Self {
        Self {
            session,
            source: None,
            params: Vec::new(),
            description: None,
            position: 0,
            known_len: None,
            executed: false,
            closed: false,
        }
    }

    fn check_ready(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::CursorClosed);
        }
        if !self.executed {
            return Err(StorageError::CursorNotExecuted);
        }
        Ok(())
    }

    /// Drop the current statement and release its snapshot, if any.
    fn release(&mut self) {
        if let Some(Source::Windowed { snapshot, .. }) = self.source.take() {
            self.session.end_snapshot(&snapshot);
        }
    }

    fn window(&self, body: &str, limit: usize, offset: usize) -> StorageResult<Vec<Row>> {
        let limit = limit.min(i64::MAX as usize);
        let sql = format!("SELECT * FROM ({body}) LIMIT {limit} OFFSET {offset}");
        self.session.logged(&sql, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let column_count = stmt.column_count();
            let rows = stmt.query(rusqlite::params_from_iter(self.params.iter()))?;
            collect_rows(rows, column_count)
        })
    }

    /// Whether the result has at least `len` rows.
    fn has_rows(&self, len: usize) -> StorageResult<bool> {
        if len == 0 {
            return Ok(true);
        }
        if let Some(known) = self.known_len {
            return Ok(len <= known);
        }
        let Some(Source::Windowed { body, .. }) = &self.source else {
            return Ok(false);
        };
        let sql = format!("SELECT 1 FROM ({body}) LIMIT 1 OFFSET {}", len - 1);
        self.session.logged(&sql, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(self.params.iter()))?;
            Ok(rows.next()?.is_some())
        })
    }
}

impl Cursor for ServerSideCursor {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::CursorClosed);
        }
        self.release();
        let body = subquery_body(sql).to_string();
        let (description, materialized) = self.session.logged(sql, |conn| {
            let mut stmt = conn.prepare(&body)?;
            let description = describe(&stmt);
            if windowable(&body, &stmt) {
                return Ok((description, None));
            }
            let column_count = stmt.column_count();
            let rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            Ok((description, Some(collect_rows(rows, column_count)?)))
        })?;
        let source = match materialized {
            Some(rows) => Source::Materialized(rows),
            None => Source::Windowed {
                snapshot: self.session.begin_snapshot()?,
                body,
            },
        };
        self.known_len = match &source {
            Source::Materialized(rows) => Some(rows.len()),
            Source::Windowed { .. } => None,
        };
        debug!(
            windowed = self.known_len.is_none(),
            "server-side cursor executed"
        );
        self.description = (!description.is_empty()).then_some(description);
        self.source = Some(source);
        self.params = params.to_vec();
        self.position = 0;
        self.executed = true;
        Ok(())
    }

    fn fetch_one(&mut self) -> StorageResult<Option<Row>> {
        Ok(self.fetch_many(1)?.into_iter().next())
    }

    fn fetch_many(&mut self, size: usize) -> StorageResult<Vec<Row>> {
        self.check_ready()?;
        if size == 0 || self.known_len.is_some_and(|len| self.position >= len) {
            return Ok(Vec::new());
        }
        let rows = match &self.source {
            None => return Ok(Vec::new()),
            Some(Source::Materialized(rows)) => {
                let end = self.position.saturating_add(size).min(rows.len());
                rows[self.position..end].to_vec()
            }
            Some(Source::Windowed { body, .. }) => self.window(body, size, self.position)?,
        };
        if rows.len() < size {
            self.known_len = Some(self.position + rows.len());
        }
        self.position += rows.len();
        Ok(rows)
    }

    fn scroll(&mut self, value: i64, mode: ScrollMode) -> StorageResult<()> {
        self.check_ready()?;
        let target = scroll_target(self.position, value, mode);
        let out_of_range = StorageError::ScrollOutOfRange {
            position: self.position,
            target,
        };
        if target < 0 {
            return Err(out_of_range);
        }
        let target_pos = target as usize;
        if target_pos > self.position && !self.has_rows(target_pos)? {
            return Err(out_of_range);
        }
        self.position = target_pos;
        Ok(())
    }

    fn description(&self) -> Option<&[ColumnDescription]> {
        self.description.as_deref()
    }

    fn row_number(&self) -> usize {
        self.position
    }

    fn close(&mut self) -> StorageResult<()> {
        self.release();
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ServerSideCursor {
    fn drop(&mut self) {
        self.release();
    }
}
