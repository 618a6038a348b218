//! Backend plumbing: the driver cursor surface, connection wrappers, and the
//! engine loader.
//!
//! - `Cursor`: execute / fetch / scroll / close over one statement
//! - `DatabaseWrapper`: one physical connection for one alias
//! - `Backend`: builds wrappers for an engine identifier
//! - `BackendLoader`: engine identifier → backend

pub mod dummy;
pub mod query_log;
pub mod sqlite;

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rawscroll_core::config::{ConnectionSettings, QueryLogConfig};
use rawscroll_core::errors::{StorageError, StorageResult};
use rawscroll_core::types::{ColumnDescription, Row, SqlValue};
use rustc_hash::FxHashMap;

pub use dummy::DummyBackend;
pub use query_log::{QueryLog, QueryLogEntry};
pub use sqlite::SqliteBackend;

/// A live connection as handed out by the registry. `Rc` keeps it on the
/// thread that created it.
pub type ConnectionHandle = Rc<dyn DatabaseWrapper>;

/// How `Cursor::scroll` interprets its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Move by `value` rows from the current position.
    Relative,
    /// Move to row `value` counted from the start of the result.
    Absolute,
}

/// Process-unique identity of one physical connection wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// The driver cursor surface the query engine consumes.
///
/// Positions count rows from the start of the result: 0 is before the first
/// row and `row_count` is past the last. A scroll that would leave
/// `[0, row_count]` fails with `ScrollOutOfRange` and does not move.
pub trait Cursor {
    /// Run `sql` with positional parameters. Resets the position to 0.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<()>;

    /// Next row, or `None` at the end of the result.
    fn fetch_one(&mut self) -> StorageResult<Option<Row>>;

    /// Up to `size` rows; fewer once the result runs out.
    fn fetch_many(&mut self, size: usize) -> StorageResult<Vec<Row>>;

    fn scroll(&mut self, value: i64, mode: ScrollMode) -> StorageResult<()>;

    /// Column metadata of the last executed statement.
    fn description(&self) -> Option<&[ColumnDescription]>;

    /// Current position.
    fn row_number(&self) -> usize;

    fn close(&mut self) -> StorageResult<()>;

    fn is_closed(&self) -> bool;
}

/// One connection to one alias.
pub trait DatabaseWrapper {
    fn id(&self) -> ConnectionId;

    fn alias(&self) -> &str;

    /// Short vendor name, e.g. "sqlite".
    fn vendor(&self) -> &'static str;

    fn settings(&self) -> &ConnectionSettings;

    /// Whether cursors from this wrapper stream from the server instead of
    /// materializing the result at execute time.
    fn uses_server_side_cursors(&self) -> bool {
        false
    }

    /// Open a new cursor, connecting first if needed.
    fn cursor(&self) -> StorageResult<Box<dyn Cursor>>;

    /// Whether a physical connection is currently open.
    fn is_connected(&self) -> bool;

    fn close(&self) -> StorageResult<()>;

    /// Roll back an open transaction. `Ok(false)` when there was none.
    fn rollback(&self) -> StorageResult<bool>;

    fn in_transaction(&self) -> bool;

    /// Statements recorded since the last reset (empty unless the query log
    /// is enabled).
    fn queries(&self) -> Vec<QueryLogEntry>;

    fn reset_queries(&self);

    /// Convert a raw column name reported by the driver into the name the
    /// query layer matches against fields.
    fn normalize_identifier(&self, name: &str) -> String {
        name.to_string()
    }
}

impl fmt::Debug for dyn DatabaseWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseWrapper")
            .field("id", &self.id())
            .field("alias", &self.alias())
            .field("vendor", &self.vendor())
            .finish()
    }
}

/// A database engine able to build connection wrappers.
pub trait Backend: Send + Sync {
    /// Engine identifier the loader registers this backend under.
    fn engine(&self) -> &str;

    /// Build the plain wrapper.
    fn connect(
        &self,
        alias: &str,
        settings: ConnectionSettings,
        log: QueryLogConfig,
    ) -> StorageResult<ConnectionHandle>;

    fn supports_server_side_cursors(&self) -> bool {
        false
    }

    /// Build the server-side cursor wrapper. Falls back to `connect`.
    fn connect_server_side(
        &self,
        alias: &str,
        settings: ConnectionSettings,
        log: QueryLogConfig,
    ) -> StorageResult<ConnectionHandle> {
        self.connect(alias, settings, log)
    }
}

/// Engine identifier → backend.
#[derive(Clone, Default)]
pub struct BackendLoader {
    backends: FxHashMap<String, Arc<dyn Backend>>,
}

impl BackendLoader {
    /// An empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader with the `sqlite` and `dummy` engines registered.
    pub fn with_builtin() -> Self {
        let mut loader = Self::new();
        loader.register(Arc::new(SqliteBackend));
        loader.register(Arc::new(DummyBackend));
        loader
    }

    /// Register (or replace) a backend under its engine identifier.
    pub fn register(&mut self, backend: Arc<dyn Backend>) -> &mut Self {
        self.backends.insert(backend.engine().to_string(), backend);
        self
    }

    pub fn load(&self, engine: &str) -> StorageResult<Arc<dyn Backend>> {
        self.backends
            .get(engine)
            .cloned()
            .ok_or_else(|| StorageError::BackendNotFound {
                engine: engine.to_string(),
            })
    }

    /// Registered engine identifiers, sorted.
    pub fn engines(&self) -> Vec<&str> {
        let mut engines: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        engines.sort_unstable();
        engines
    }
}

impl fmt::Debug for BackendLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendLoader")
            .field("engines", &self.engines())
            .finish()
    }
}

/// Strip trailing semicolons and whitespace so `sql` can be nested as a
/// subquery.
pub(crate) fn subquery_body(sql: &str) -> &str {
    sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_engines_registered() {
        let loader = BackendLoader::with_builtin();
        assert_eq!(loader.engines(), vec!["dummy", "sqlite"]);
        assert!(loader.load("sqlite").is_ok());
    }

    #[test]
    fn unknown_engine_fails() {
        let loader = BackendLoader::with_builtin();
        match loader.load("oracle").err() {
            Some(StorageError::BackendNotFound { engine }) => assert_eq!(engine, "oracle"),
            other => panic!("expected BackendNotFound, got {other:?}"),
        }
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::next(), ConnectionId::next());
    }

    #[test]
    fn subquery_body_strips_terminators() {
        assert_eq!(subquery_body("SELECT 1 ;\n"), "SELECT 1");
        assert_eq!(subquery_body("  SELECT 1"), "SELECT 1");
    }
}
