//! Row ranges for `RawQuery::slice`.

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use rawscroll_core::errors::{QueryError, QueryResult};

/// A `[start, stop)` row range. Missing bounds mean "from the first row" and
/// "up to the max page extent". `step` is accepted and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowSlice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl RowSlice {
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    pub fn range(start: i64, stop: i64) -> Self {
        Self::new(Some(start), Some(stop))
    }

    pub fn from_start(start: i64) -> Self {
        Self::new(Some(start), None)
    }

    pub fn to(stop: i64) -> Self {
        Self::new(None, Some(stop))
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Negative bounds would need backward scrolling from the end.
    pub fn validate(&self) -> QueryResult<()> {
        if self.start.is_some_and(|s| s < 0) || self.stop.is_some_and(|s| s < 0) {
            return Err(QueryError::UnsupportedIndex {
                index: self.to_string(),
            });
        }
        Ok(())
    }

    /// Concrete `(start, stop)` offsets. Call `validate` first.
    pub fn bounds(&self, max_extent: u64) -> (usize, usize) {
        let start = self.start.unwrap_or(0).max(0) as usize;
        let stop = match self.stop {
            Some(stop) => stop.max(0) as usize,
            None => usize::try_from(max_extent).unwrap_or(usize::MAX),
        };
        (start, stop)
    }
}

impl fmt::Display for RowSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<i64>| b.map(|v| v.to_string()).unwrap_or_default();
        write!(f, "[{}:{}", bound(self.start), bound(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        write!(f, "]")
    }
}

impl From<Range<i64>> for RowSlice {
    fn from(r: Range<i64>) -> Self {
        Self::range(r.start, r.end)
    }
}

impl From<RangeFrom<i64>> for RowSlice {
    fn from(r: RangeFrom<i64>) -> Self {
        Self::from_start(r.start)
    }
}

impl From<RangeTo<i64>> for RowSlice {
    fn from(r: RangeTo<i64>) -> Self {
        Self::to(r.end)
    }
}

impl From<RangeFull> for RowSlice {
    fn from(_: RangeFull) -> Self {
        Self::all()
    }
}
