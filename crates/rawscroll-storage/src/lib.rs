//! Storage layer for rawscroll.
//!
//! Per-thread connection registries over pluggable backends (SQLite and a
//! dummy engine built in), scrollable raw SQL queries with random row access,
//! projection of rows onto record schemas, and offset pagination.

pub mod backend;
pub mod connection;
pub mod pagination;
pub mod projection;
pub mod query;

pub use backend::{
    Backend, BackendLoader, ConnectionHandle, ConnectionId, Cursor, DatabaseWrapper, ScrollMode,
};
pub use connection::lifecycle;
pub use connection::{BulkResult, ConnectionHandler, Connections};
pub use pagination::{Page, Paginator};
pub use projection::{FieldKind, PageCountMode, RawQuerySet, Record, RowCount, Schema};
pub use query::{CursorState, RawQuery, RowSlice};
