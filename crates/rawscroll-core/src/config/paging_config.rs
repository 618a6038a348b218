//! Paging configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_PAGES, DEFAULT_ROWS_PER_PAGE};

/// Page geometry. The product of the two bounds how far any slice or count
/// probe will ever scroll.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PagingConfig {
    /// Rows per page. Default: 25.
    pub rows_per_page: Option<usize>,
    /// Number of addressable pages. Default: 9999.
    pub max_pages: Option<u64>,
}

impl PagingConfig {
    /// Returns the effective rows per page, defaulting to 25.
    pub fn effective_rows_per_page(&self) -> usize {
        self.rows_per_page.unwrap_or(DEFAULT_ROWS_PER_PAGE)
    }

    /// Returns the effective page cap, defaulting to 9999.
    pub fn effective_max_pages(&self) -> u64 {
        self.max_pages.unwrap_or(DEFAULT_MAX_PAGES)
    }

    /// Largest row offset the engine will address: rows per page times the
    /// page cap (249,975 with defaults).
    pub fn max_extent(&self) -> u64 {
        (self.effective_rows_per_page() as u64).saturating_mul(self.effective_max_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAX_PAGE_EXTENT;

    #[test]
    fn default_extent() {
        assert_eq!(PagingConfig::default().max_extent(), DEFAULT_MAX_PAGE_EXTENT);
    }

    #[test]
    fn extent_saturates() {
        let paging = PagingConfig {
            rows_per_page: Some(usize::MAX),
            max_pages: Some(u64::MAX),
        };
        assert_eq!(paging.max_extent(), u64::MAX);
    }
}
