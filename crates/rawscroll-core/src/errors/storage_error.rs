//! Storage-layer errors: backends, connections, and cursors.

use super::error_code::{self, ErrorCode};
use super::ConfigError;

/// Errors raised by the connection registry, backends, and driver cursors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("The connection {alias} doesn't exist")]
    ConnectionDoesNotExist { alias: String },

    #[error("no backend registered for engine '{engine}'")]
    BackendNotFound { engine: String },

    #[error("improperly configured: {message}")]
    ImproperlyConfigured { message: String },

    #[error("scroll destination {target} out of bounds (position {position})")]
    ScrollOutOfRange { position: usize, target: i64 },

    #[error("cursor has not executed a statement")]
    CursorNotExecuted,

    #[error("cursor already closed")]
    CursorClosed,

    #[error("connection '{alias}' is already in use")]
    ConnectionBusy { alias: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StorageError {
    /// Wrap any driver error message.
    pub fn sqlite(message: impl std::fmt::Display) -> Self {
        Self::Sqlite {
            message: message.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::sqlite(e)
    }
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } | Self::ConnectionBusy { .. } => error_code::STORAGE_ERROR,
            Self::ConnectionDoesNotExist { .. } => error_code::CONNECTION_DOES_NOT_EXIST,
            Self::BackendNotFound { .. } => error_code::BACKEND_NOT_FOUND,
            Self::ImproperlyConfigured { .. } => error_code::IMPROPERLY_CONFIGURED,
            Self::ScrollOutOfRange { .. } => error_code::SCROLL_OUT_OF_RANGE,
            Self::CursorNotExecuted | Self::CursorClosed => error_code::CURSOR_STATE,
            Self::Config(e) => e.error_code(),
        }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
