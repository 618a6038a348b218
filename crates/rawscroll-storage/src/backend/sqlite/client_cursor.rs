//! Client-side cursor: the whole result is read at execute time and scrolled
//! in memory.

use std::rc::Rc;

use rawscroll_core::errors::{StorageError, StorageResult};
use rawscroll_core::types::{ColumnDescription, Row, SqlValue};
use tracing::debug;

use super::{collect_rows, describe, scroll_target, SqliteSession};
use crate::backend::{Cursor, ScrollMode};

pub struct ClientCursor {
    session: Rc<SqliteSession>,
    description: Option<Vec<ColumnDescription>>,
    rows: Vec<Row>,
    position: usize,
    executed: bool,
    closed: bool,
}

impl ClientCursor {
    pub(crate) fn new(session: Rc<SqliteSession>) -> Self {
        Self {
            session,
            description: None,
            rows: Vec::new(),
            position: 0,
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
}

impl Cursor for ClientCursor {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::CursorClosed);
        }
        let (description, rows) = self.session.logged(sql, |conn| {
            let mut stmt = conn.prepare(sql)?;
            let description = describe(&stmt);
            let column_count = stmt.column_count();
            let rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            Ok((description, collect_rows(rows, column_count)?))
        })?;
        debug!(rows = rows.len(), "client cursor executed");
        self.description = (!description.is_empty()).then_some(description);
        self.rows = rows;
        self.position = 0;
        self.executed = true;
        Ok(())
    }

    fn fetch_one(&mut self) -> StorageResult<Option<Row>> {
        self.check_ready()?;
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn fetch_many(&mut self, size: usize) -> StorageResult<Vec<Row>> {
        self.check_ready()?;
        let end = self.position.saturating_add(size).min(self.rows.len());
        let batch = self.rows[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }

    fn scroll(&mut self, value: i64, mode: ScrollMode) -> StorageResult<()> {
        self.check_ready()?;
        let target = scroll_target(self.position, value, mode);
        if target < 0 || target > self.rows.len() as i64 {
            return Err(StorageError::ScrollOutOfRange {
                position: self.position,
                target,
            });
        }
        self.position = target as usize;
        Ok(())
    }

    fn description(&self) -> Option<&[ColumnDescription]> {
        self.description.as_deref()
    }

    fn row_number(&self) -> usize {
        self.position
    }

    fn close(&mut self) -> StorageResult<()> {
        self.rows.clear();
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
