//! Log output for processes embedding rawscroll.
//!
//! Directives come from `RAWSCROLL_LOG`, for example
//! `RAWSCROLL_LOG=rawscroll_storage::query=trace`. An unset or unparsable
//! value falls back to `rawscroll=info`.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::constants::{DEFAULT_LOG_DIRECTIVES, LOG_ENV_VAR};

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// The filter `init_tracing` installs.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

/// Install a global `fmt` subscriber filtered by `env_filter`.
///
/// Only the first call does anything. Returns false when another global
/// subscriber was already set, which leaves the host's logging alone.
pub fn init_tracing() -> bool {
    *INSTALLED.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_thread_ids(true)
            .with_line_number(true)
            .try_init()
            .is_ok()
    })
}
