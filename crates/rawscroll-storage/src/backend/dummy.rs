//! The engine an alias gets when its config names none. It connects, but
//! refuses to hand out cursors.

use std::rc::Rc;

use rawscroll_core::config::{ConnectionSettings, QueryLogConfig};
use rawscroll_core::constants::DUMMY_ENGINE;
use rawscroll_core::errors::{StorageError, StorageResult};

use super::{Backend, ConnectionHandle, ConnectionId, Cursor, DatabaseWrapper, QueryLogEntry};

pub struct DummyBackend;

impl Backend for DummyBackend {
    fn engine(&self) -> &str {
        DUMMY_ENGINE
    }

    fn connect(
        &self,
        alias: &str,
        settings: ConnectionSettings,
        _log: QueryLogConfig,
    ) -> StorageResult<ConnectionHandle> {
        Ok(Rc::new(DummyWrapper {
            id: ConnectionId::next(),
            alias: alias.to_string(),
            settings,
        }))
    }
}

pub struct DummyWrapper {
    id: ConnectionId,
    alias: String,
    settings: ConnectionSettings,
}

impl DatabaseWrapper for DummyWrapper {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn vendor(&self) -> &'static str {
        "dummy"
    }

    fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    fn cursor(&self) -> StorageResult<Box<dyn Cursor>> {
        Err(StorageError::ImproperlyConfigured {
            message: format!(
                "database '{}' has no engine configured; supply the engine value",
                self.alias
            ),
        })
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    fn rollback(&self) -> StorageResult<bool> {
        Ok(false)
    }

    fn in_transaction(&self) -> bool {
        false
    }

    fn queries(&self) -> Vec<QueryLogEntry> {
        Vec::new()
    }

    fn reset_queries(&self) {}
}
