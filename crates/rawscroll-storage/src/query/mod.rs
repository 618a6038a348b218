//! Scrollable raw queries.

pub mod raw_query;
pub mod slice;

pub use raw_query::{CursorState, RawQuery};
pub use slice::RowSlice;
