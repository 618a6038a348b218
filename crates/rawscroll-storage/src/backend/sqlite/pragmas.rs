//! PRAGMA configuration applied to every SQLite connection.
//!
//! 5s busy_timeout and foreign_keys ON, then one PRAGMA per entry in the
//! alias's `options` map.

use std::collections::BTreeMap;

use rawscroll_core::errors::{StorageError, StorageResult};
use rusqlite::Connection;

/// Apply base pragmas followed by the configured options.
pub fn apply_pragmas(conn: &Connection, options: &BTreeMap<String, String>) -> StorageResult<()> {
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    for (name, value) in options {
        if !is_pragma_name(name) {
            return Err(StorageError::ImproperlyConfigured {
                message: format!("invalid sqlite option name '{name}'"),
            });
        }
        conn.pragma_update(None, name.as_str(), value.as_str())?;
    }
    Ok(())
}

fn is_pragma_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
