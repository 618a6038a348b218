//! SQLite backend over `rusqlite`.
//!
//! The physical connection opens on the first cursor and reopens after
//! `close`. The plain wrapper hands out client-side cursors that materialize
//! the result at execute time; the server-side variant hands out windowed
//! cursors that only ever hold the rows of the current fetch.

pub mod client_cursor;
pub mod pragmas;
pub mod server_cursor;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use rawscroll_core::config::{ConnectionSettings, QueryLogConfig};
use rawscroll_core::constants::SQLITE_ENGINE;
use rawscroll_core::errors::{StorageError, StorageResult};
use rawscroll_core::types::{ColumnDescription, Row};
use rusqlite::Connection;
use tracing::debug;

use self::client_cursor::ClientCursor;
use self::pragmas::apply_pragmas;
use self::server_cursor::ServerSideCursor;
use super::{
    Backend, ConnectionHandle, ConnectionId, Cursor, DatabaseWrapper, QueryLog, QueryLogEntry,
    ScrollMode,
};

/// Destination of a scroll from `position`, before bounds checking.
pub(crate) fn scroll_target(position: usize, value: i64, mode: ScrollMode) -> i64 {
    match mode {
        ScrollMode::Relative => (position as i64).saturating_add(value),
        ScrollMode::Absolute => value,
    }
}

/// Column metadata of a prepared statement.
pub(crate) fn describe(stmt: &rusqlite::Statement<'_>) -> Vec<ColumnDescription> {
    stmt.columns()
        .iter()
        .map(|c| ColumnDescription::new(c.name(), c.decl_type().map(str::to_string)))
        .collect()
}

/// Drain `rows` into owned values.
pub(crate) fn collect_rows(
    mut rows: rusqlite::Rows<'_>,
    column_count: usize,
) -> StorageResult<Vec<Row>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(row.get_ref(i)?.into());
        }
        out.push(values);
    }
    Ok(out)
}

pub struct SqliteBackend;

impl Backend for SqliteBackend {
    fn engine(&self) -> &str {
        SQLITE_ENGINE
    }

    fn connect(
        &self,
        alias: &str,
        settings: ConnectionSettings,
        log: QueryLogConfig,
    ) -> StorageResult<ConnectionHandle> {
        Ok(Rc::new(SqliteWrapper::new(alias, settings, log, false)))
    }

    fn supports_server_side_cursors(&self) -> bool {
        true
    }

    fn connect_server_side(
        &self,
        alias: &str,
        settings: ConnectionSettings,
        log: QueryLogConfig,
    ) -> StorageResult<ConnectionHandle> {
        Ok(Rc::new(SqliteWrapper::new(alias, settings, log, true)))
    }
}

/// State shared between a wrapper and every cursor it handed out.
pub(crate) struct SqliteSession {
    alias: String,
    settings: ConnectionSettings,
    conn: RefCell<Option<Connection>>,
    log: QueryLog,
    snapshots: Cell<u64>,
}

impl SqliteSession {
    fn open(&self) -> StorageResult<Connection> {
        let conn = match self.settings.name.as_str() {
            "" | ":memory:" => Connection::open_in_memory()?,
            path => Connection::open(path)?,
        };
        apply_pragmas(&conn, &self.settings.options)?;
        debug!(alias = %self.alias, name = %self.settings.name, "sqlite connection opened");
        Ok(conn)
    }

    /// Run `f` against the physical connection, opening it first if needed.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut slot = self
            .conn
            .try_borrow_mut()
            .map_err(|_| StorageError::ConnectionBusy {
                alias: self.alias.clone(),
            })?;
        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        let Some(conn) = slot.as_ref() else {
            return Err(StorageError::sqlite("connection unavailable"));
        };
        f(conn)
    }

    /// Open a savepoint and start its read transaction, so every later read
    /// on this connection sees the same data until `end_snapshot`. Nests
    /// inside a transaction the caller already has open.
    pub(crate) fn begin_snapshot(&self) -> StorageResult<String> {
        let id = self.snapshots.get() + 1;
        self.snapshots.set(id);
        let name = format!("rawscroll_snapshot_{id}");
        self.with_connection(|conn| {
            conn.execute_batch(&format!("SAVEPOINT {name}"))?;
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(())
        })?;
        debug!(alias = %self.alias, snapshot = %name, "read snapshot pinned");
        Ok(name)
    }

    /// Release a savepoint opened by `begin_snapshot`. Does nothing once the
    /// savepoint is gone.
    pub(crate) fn end_snapshot(&self, name: &str) {
        let Ok(slot) = self.conn.try_borrow() else {
            return;
        };
        let Some(conn) = slot.as_ref() else {
            return;
        };
        if conn.is_autocommit() {
            return;
        }
        if let Err(e) = conn.execute_batch(&format!("RELEASE SAVEPOINT {name}")) {
            debug!(alias = %self.alias, snapshot = %name, error = %e, "snapshot already released");
        }
    }

    /// Run `f`, recording `sql` in the query log with its elapsed time.
    pub(crate) fn logged<T>(
        &self,
        sql: &str,
        f: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let started = Instant::now();
        let result = self.with_connection(f);
        self.log.record(sql, started.elapsed());
        result
    }
}

pub struct SqliteWrapper {
    id: ConnectionId,
    server_side: bool,
    session: Rc<SqliteSession>,
}

impl SqliteWrapper {
    pub fn new(
        alias: &str,
        settings: ConnectionSettings,
        log: QueryLogConfig,
        server_side: bool,
    ) -> Self {
        Self {
            id: ConnectionId::next(),
            server_side,
            session: Rc::new(SqliteSession {
                alias: alias.to_string(),
                settings,
                conn: RefCell::new(None),
                log: QueryLog::new(log),
                snapshots: Cell::new(0),
            }),
        }
    }
}

impl DatabaseWrapper for SqliteWrapper {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn alias(&self) -> &str {
        &self.session.alias
    }

    fn vendor(&self) -> &'static str {
        "sqlite"
    }

    fn settings(&self) -> &ConnectionSettings {
        &self.session.settings
    }

    fn uses_server_side_cursors(&self) -> bool {
        self.server_side
    }

    fn cursor(&self) -> StorageResult<Box<dyn Cursor>> {
        // Connect eagerly so a bad database path surfaces here, not on execute.
        self.session.with_connection(|_| Ok(()))?;
        let session = Rc::clone(&self.session);
        Ok(if self.server_side {
            Box::new(ServerSideCursor::new(session))
        } else {
            Box::new(ClientCursor::new(session))
        })
    }

    fn is_connected(&self) -> bool {
        self.session
            .conn
            .try_borrow()
            .map(|slot| slot.is_some())
            .unwrap_or(true)
    }

    fn close(&self) -> StorageResult<()> {
        let taken = self
            .session
            .conn
            .try_borrow_mut()
            .map_err(|_| StorageError::ConnectionBusy {
                alias: self.session.alias.clone(),
            })?
            .take();
        match taken {
            Some(conn) => {
                conn.close().map_err(|(_, e)| StorageError::from(e))?;
                debug!(alias = %self.session.alias, id = %self.id, "sqlite connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn rollback(&self) -> StorageResult<bool> {
        if !self.in_transaction() {
            return Ok(false);
        }
        self.session.logged("ROLLBACK", |conn| {
            conn.execute_batch("ROLLBACK")?;
            Ok(true)
        })
    }

    fn in_transaction(&self) -> bool {
        self.session
            .conn
            .try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().map(|conn| !conn.is_autocommit()))
            .unwrap_or(false)
    }

    fn queries(&self) -> Vec<QueryLogEntry> {
        self.session.log.entries()
    }

    fn reset_queries(&self) {
        self.session.log.reset();
    }
}
