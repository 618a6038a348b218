//! Offset pagination over a raw query set.
//! Page numbers are 1-based. The count is taken once per paginator.

use rawscroll_core::errors::{QueryError, QueryResult};
use serde::Serialize;

use crate::projection::{RawQuerySet, Record, RowCount};
use crate::query::RowSlice;

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub number: u64,
    pub items: Vec<T>,
    pub total: RowCount,
    pub num_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next.then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous.then(|| self.number - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            number: self.number,
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            num_pages: self.num_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

pub struct Paginator {
    queryset: RawQuerySet,
    rows_per_page: usize,
    count: Option<RowCount>,
}

impl Paginator {
    /// Page size comes from the configured `paging.rows_per_page`.
    pub fn new(queryset: RawQuerySet) -> Self {
        let rows_per_page = queryset
            .query()
            .connections()
            .handler()
            .config()
            .paging
            .effective_rows_per_page();
        Self {
            queryset,
            rows_per_page: rows_per_page.max(1),
            count: None,
        }
    }

    pub fn with_rows_per_page(mut self, rows_per_page: usize) -> Self {
        self.rows_per_page = rows_per_page.max(1);
        self
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn queryset(&mut self) -> &mut RawQuerySet {
        &mut self.queryset
    }

    pub fn into_inner(self) -> RawQuerySet {
        self.queryset
    }

    pub fn count(&mut self) -> QueryResult<RowCount> {
        if let Some(count) = self.count {
            return Ok(count);
        }
        let count = self.queryset.count()?;
        self.count = Some(count);
        Ok(count)
    }

    /// At least 1, so an empty result still has a first page.
    pub fn num_pages(&mut self) -> QueryResult<u64> {
        let pages = match self.count()?.as_u64() {
            None => 1,
            Some(rows) => rows.div_ceil(self.rows_per_page as u64).max(1),
        };
        Ok(pages)
    }

    pub fn page(&mut self, number: u64) -> QueryResult<Page<Record>> {
        if number == 0 {
            return Err(QueryError::InvalidPage {
                page: number,
                message: "page numbers start at 1".to_string(),
            });
        }
        let total = self.count()?;
        let num_pages = self.num_pages()?;
        if number > num_pages {
            return Err(QueryError::InvalidPage {
                page: number,
                message: format!("only {num_pages} page(s) available"),
            });
        }
        let items = match total {
            RowCount::Unbounded => self.queryset.all()?,
            _ => {
                let per_page = self.rows_per_page as u64;
                let start = (number - 1).saturating_mul(per_page);
                let stop = start.saturating_add(per_page);
                let bound = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
                self.queryset
                    .slice(RowSlice::range(bound(start), bound(stop)))?
            }
        };
        Ok(Page {
            number,
            items,
            total,
            num_pages,
            has_next: number < num_pages,
            has_previous: number > 1,
        })
    }
}
