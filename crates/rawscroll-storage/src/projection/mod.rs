//! Projection of raw rows onto record schemas.

pub mod queryset;
pub mod record;
pub mod schema;

pub use queryset::{PageCountMode, RawQuerySet, RowCount};
pub use record::Record;
pub use schema::{Field, FieldKind, Schema, SchemaBuilder};
