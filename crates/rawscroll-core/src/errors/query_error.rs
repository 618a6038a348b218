//! Query and projection errors.

use super::error_code::{self, ErrorCode};
use super::StorageError;

/// Errors raised while running a raw query or projecting its rows.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("resolving query column error on '{alias}' for `{sql}`: {message}")]
    ColumnResolution {
        alias: String,
        sql: String,
        message: String,
    },

    #[error("Negative indexing is not supported: {index}")]
    UnsupportedIndex { index: String },

    #[error("invalid raw query on '{alias}' for `{sql}`: {message}")]
    InvalidQuery {
        alias: String,
        sql: String,
        message: String,
    },

    #[error("field '{field}' was deferred and is not loaded")]
    DeferredField { field: String },

    #[error("no field or annotation named '{field}'")]
    UnknownField { field: String },

    #[error("cannot convert value for field '{field}': {message}")]
    FieldConversion { field: String, message: String },

    #[error("invalid page {page}: {message}")]
    InvalidPage { page: u64, message: String },

    #[error("raw query already closed")]
    QueryClosed,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ErrorCode for QueryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnResolution { .. } => error_code::COLUMN_RESOLUTION_ERROR,
            Self::UnsupportedIndex { .. } => error_code::UNSUPPORTED_INDEX,
            Self::InvalidQuery { .. } => error_code::INVALID_QUERY,
            Self::DeferredField { .. }
            | Self::UnknownField { .. }
            | Self::FieldConversion { .. } => error_code::FIELD_ERROR,
            Self::InvalidPage { .. } => error_code::INVALID_PAGE,
            Self::QueryClosed => error_code::CURSOR_STATE,
            Self::Storage(e) => e.error_code(),
        }
    }
}

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
