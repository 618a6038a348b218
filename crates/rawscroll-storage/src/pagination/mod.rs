//! Numbered pages over a `RawQuerySet`.

pub mod page;

pub use page::{Page, Paginator};
