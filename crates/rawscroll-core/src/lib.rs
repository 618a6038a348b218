//! Core types, errors, configuration, and tracing for rawscroll.
//!
//! Everything in here is shared by the storage layer: the value model for
//! raw rows, one error enum per subsystem, the layered TOML configuration
//! (including the per-alias defaults resolver), and tracing setup.

pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing;
pub mod types;

pub use config::{ConnectionSettings, DatabaseConfig, RawScrollConfig, TestSettings};
pub use errors::{ConfigError, ErrorCode, QueryError, StorageError};
pub use types::{ColumnDescription, Row, SqlValue};
