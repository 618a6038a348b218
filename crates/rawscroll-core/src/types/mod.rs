//! Value model shared by cursors, queries, and records.

pub mod value;

pub use value::{ColumnDescription, Row, SqlValue};
