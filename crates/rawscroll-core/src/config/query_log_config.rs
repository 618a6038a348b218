//! Per-connection query log configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_QUERY_LOG_MAX_ENTRIES;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueryLogConfig {
    /// Record every executed statement on its connection. Default: false.
    pub enabled: Option<bool>,
    /// Entries kept per connection before the oldest are dropped. Default: 9000.
    pub max_entries: Option<usize>,
}

impl QueryLogConfig {
    pub fn effective_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }

    pub fn effective_max_entries(&self) -> usize {
        self.max_entries.unwrap_or(DEFAULT_QUERY_LOG_MAX_ENTRIES)
    }
}
