//! Connection management: one shared handler, one registry per thread.
//!
//! `ConnectionHandler` is `Send + Sync` and carries the configuration and the
//! backend loader. Each thread asks it for a `Connections` scope, which lazily
//! opens and caches one handle per alias. Handles are `Rc`, so neither the
//! scope nor anything it hands out can move to another thread.

pub mod lifecycle;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use rawscroll_core::config::{ConnectionSettings, RawScrollConfig};
use rawscroll_core::errors::{ConfigError, ErrorCode, StorageError, StorageResult};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::backend::{BackendLoader, ConnectionHandle};

pub use lifecycle::{BulkResult, ConnectionOutcome};

struct HandlerInner {
    config: RawScrollConfig,
    backends: BackendLoader,
}

/// Shared entry point: configuration plus backend loader.
#[derive(Clone)]
pub struct ConnectionHandler {
    inner: Arc<HandlerInner>,
}

impl ConnectionHandler {
    pub fn new(config: RawScrollConfig, backends: BackendLoader) -> Self {
        Self {
            inner: Arc::new(HandlerInner { config, backends }),
        }
    }

    /// A handler with the built-in `sqlite` and `dummy` engines.
    pub fn with_builtin(config: RawScrollConfig) -> Self {
        Self::new(config, BackendLoader::with_builtin())
    }

    pub fn config(&self) -> &RawScrollConfig {
        &self.inner.config
    }

    pub fn backends(&self) -> &BackendLoader {
        &self.inner.backends
    }

    pub fn default_alias(&self) -> &str {
        self.inner.config.effective_default_alias()
    }

    /// Configured aliases, in a stable order. Call again to restart.
    pub fn aliases(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.inner.config.aliases()
    }

    /// Resolve an alias's settings, failing with `ConnectionDoesNotExist`
    /// when it is not configured.
    pub fn ensure_defaults(&self, alias: &str) -> StorageResult<ConnectionSettings> {
        self.inner
            .config
            .ensure_defaults(alias)
            .map_err(|e| match e {
                ConfigError::ConfigNotFound { alias } => {
                    StorageError::ConnectionDoesNotExist { alias }
                }
                other => StorageError::Config(other),
            })
    }

    /// Open a fresh, uncached handle for `alias`.
    ///
    /// Picks the backend's server-side cursor wrapper when the backend has one
    /// and `use_server_side_cursors` is on.
    pub fn connect(&self, alias: &str) -> StorageResult<ConnectionHandle> {
        let settings = self.ensure_defaults(alias)?;
        let backend = self.inner.backends.load(&settings.engine)?;
        let engine = settings.engine.clone();
        let log = self.inner.config.query_log;
        let server_side = backend.supports_server_side_cursors()
            && self.inner.config.effective_use_server_side_cursors();
        let handle = if server_side {
            backend.connect_server_side(alias, settings, log)?
        } else {
            backend.connect(alias, settings, log)?
        };
        debug!(alias, engine = %engine, server_side, id = %handle.id(), "connection created");
        Ok(handle)
    }

    /// A new, empty registry for the calling thread.
    pub fn scope(&self) -> Connections {
        Connections {
            handler: self.clone(),
            cache: Rc::new(RefCell::new(FxHashMap::default())),
            thread: thread::current().id(),
        }
    }
}

impl std::fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("aliases", &self.aliases().collect::<Vec<_>>())
            .field("backends", &self.inner.backends)
            .finish()
    }
}

/// Per-thread connection registry. Clones share the same cache.
#[derive(Clone)]
pub struct Connections {
    handler: ConnectionHandler,
    cache: Rc<RefCell<FxHashMap<String, ConnectionHandle>>>,
    thread: ThreadId,
}

impl Connections {
    pub fn handler(&self) -> &ConnectionHandler {
        &self.handler
    }

    /// Thread that owns this registry.
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// The cached handle for `alias`, opening and caching one on first use.
    pub fn get(&self, alias: &str) -> StorageResult<ConnectionHandle> {
        if let Some(handle) = self.cache.borrow().get(alias) {
            return Ok(Rc::clone(handle));
        }
        let handle = self.handler.connect(alias)?;
        self.cache
            .borrow_mut()
            .insert(alias.to_string(), Rc::clone(&handle));
        Ok(handle)
    }

    /// The handle for the configured default alias.
    pub fn default_connection(&self) -> StorageResult<ConnectionHandle> {
        self.get(self.handler.default_alias())
    }

    /// Install `handle` for `alias`, replacing whatever was cached.
    pub fn set(&self, alias: &str, handle: ConnectionHandle) {
        self.cache.borrow_mut().insert(alias.to_string(), handle);
    }

    /// Whether a handle for `alias` has been opened on this thread.
    pub fn contains(&self, alias: &str) -> bool {
        self.cache.borrow().contains_key(alias)
    }

    /// Configured aliases, in a stable order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.handler.aliases()
    }

    /// A handle for every configured alias, opening any not yet opened.
    pub fn all(&self) -> StorageResult<Vec<ConnectionHandle>> {
        self.aliases().map(|alias| self.get(alias)).collect()
    }

    /// Close every configured connection. Failures are collected, not fatal.
    pub fn close_all(&self) -> BulkResult {
        self.for_each_alias("close", |handle| handle.close())
    }

    /// Roll back every configured connection that has an open transaction.
    pub fn rollback_all(&self) -> BulkResult {
        self.for_each_alias("rollback", |handle| handle.rollback().map(|_| ()))
    }

    /// Clear the query log of every configured connection.
    pub fn reset_queries_all(&self) -> BulkResult {
        self.for_each_alias("reset_queries", |handle| {
            handle.reset_queries();
            Ok(())
        })
    }

    /// Forget every cached handle. Dropped handles release their connections.
    pub fn drop_all(&self) {
        self.cache.borrow_mut().clear();
    }

    fn for_each_alias(
        &self,
        operation: &'static str,
        f: impl Fn(&ConnectionHandle) -> StorageResult<()>,
    ) -> BulkResult {
        let mut result = BulkResult::new(operation);
        for alias in self.aliases() {
            let outcome = self.get(alias).and_then(|handle| f(&handle));
            if let Err(ref e) = outcome {
                warn!(alias, operation, code = e.error_code(), error = %e, "bulk connection operation failed");
            }
            result.push(alias, outcome);
        }
        result
    }
}

impl std::fmt::Debug for Connections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut open: Vec<String> = self.cache.borrow().keys().cloned().collect();
        open.sort();
        f.debug_struct("Connections")
            .field("thread", &self.thread)
            .field("open", &open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawscroll_core::config::DatabaseConfig;

    fn handler() -> ConnectionHandler {
        let config = RawScrollConfig::default()
            .with_database("default", DatabaseConfig::new("sqlite", ":memory:"))
            .with_database("other", DatabaseConfig::default());
        ConnectionHandler::with_builtin(config)
    }

    #[test]
    fn same_thread_gets_same_handle() {
        let connections = handler().scope();
        let a = connections.get("default").unwrap();
        let b = connections.get("default").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn missing_engine_resolves_to_dummy() {
        let connections = handler().scope();
        let handle = connections.get("other").unwrap();
        assert_eq!(handle.vendor(), "dummy");
        assert!(matches!(
            handle.cursor().err(),
            Some(StorageError::ImproperlyConfigured { .. })
        ));
    }

    #[test]
    fn unknown_alias_fails_without_poisoning_others() {
        let connections = handler().scope();
        assert!(matches!(
            connections.get("nope").err(),
            Some(StorageError::ConnectionDoesNotExist { alias }) if alias == "nope"
        ));
        assert!(connections.get("default").is_ok());
    }

    #[test]
    fn all_opens_every_alias() {
        let connections = handler().scope();
        assert!(!connections.contains("other"));
        let handles = connections.all().unwrap();
        assert_eq!(handles.len(), 2);
        assert!(connections.contains("default") && connections.contains("other"));
    }

    #[test]
    fn server_side_preference_is_honoured() {
        let connections = handler().scope();
        assert!(connections.get("default").unwrap().uses_server_side_cursors());

        let mut config = handler().config().clone();
        config.use_server_side_cursors = Some(false);
        let plain = ConnectionHandler::with_builtin(config).scope();
        assert!(!plain.get("default").unwrap().uses_server_side_cursors());
    }
}
