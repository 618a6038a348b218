//! Request-boundary hooks and the result type for bulk connection work.
//!
//! A request start resets every connection's query log, a request end closes
//! every connection, and a failed request rolls every connection back. Each
//! hook visits every configured alias even when some of them fail.

use rawscroll_core::errors::StorageError;
use tracing::info;

use super::Connections;

/// Outcome of a bulk operation on one alias.
#[derive(Debug)]
pub struct ConnectionOutcome {
    pub alias: String,
    pub result: Result<(), StorageError>,
}

/// Per-alias outcomes of a bulk operation over a thread's connections.
#[derive(Debug)]
pub struct BulkResult {
    pub operation: &'static str,
    pub outcomes: Vec<ConnectionOutcome>,
}

impl BulkResult {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, alias: &str, result: Result<(), StorageError>) {
        self.outcomes.push(ConnectionOutcome {
            alias: alias.to_string(),
            result,
        });
    }

    /// Returns true if every alias succeeded.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Returns the number of aliases that failed.
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Failed aliases with their errors.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &StorageError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.alias.as_str(), e)))
    }
}

/// Request started: clear every connection's query log.
pub fn request_started(connections: &Connections) -> BulkResult {
    connections.reset_queries_all()
}

/// Request finished: close every connection.
pub fn request_finished(connections: &Connections) -> BulkResult {
    connections.close_all()
}

/// Request raised: best-effort rollback of every connection. Connections
/// without an open transaction count as successes.
pub fn got_request_exception(connections: &Connections) -> BulkResult {
    let result = connections.rollback_all();
    if !result.is_clean() {
        info!(
            failed = result.error_count(),
            total = result.outcomes.len(),
            "rollback after request exception was partial"
        );
    }
    result
}
