//! Per-connection log of executed statements.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use rawscroll_core::config::QueryLogConfig;
use serde::Serialize;

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryLogEntry {
    pub sql: String,
    pub elapsed_ms: f64,
}

/// Bounded statement log owned by a single connection wrapper.
#[derive(Debug)]
pub struct QueryLog {
    enabled: bool,
    max_entries: usize,
    entries: RefCell<VecDeque<QueryLogEntry>>,
}

impl QueryLog {
    pub fn new(config: QueryLogConfig) -> Self {
        Self {
            enabled: config.effective_enabled(),
            max_entries: config.effective_max_entries(),
            entries: RefCell::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&self, sql: &str, elapsed: Duration) {
        if !self.enabled || self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.borrow_mut();
        if entries.len() == self.max_entries {
            entries.pop_front();
        }
        entries.push_back(QueryLogEntry {
            sql: sql.to_string(),
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        });
    }

    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.entries.borrow().iter().cloned().collect()
    }

    pub fn reset(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(max_entries: usize) -> QueryLog {
        QueryLog::new(QueryLogConfig {
            enabled: Some(true),
            max_entries: Some(max_entries),
        })
    }

    #[test]
    fn disabled_log_records_nothing() {
        let log = QueryLog::new(QueryLogConfig::default());
        log.record("SELECT 1", Duration::from_millis(1));
        assert!(log.entries().is_empty());
    }

    #[test]
    fn oldest_entries_drop_at_capacity() {
        let log = enabled(2);
        for sql in ["a", "b", "c"] {
            log.record(sql, Duration::ZERO);
        }
        let sqls: Vec<String> = log.entries().into_iter().map(|e| e.sql).collect();
        assert_eq!(sqls, vec!["b", "c"]);
        log.reset();
        assert!(log.entries().is_empty());
    }
}
