//! Shared constants for the rawscroll query engine.

/// rawscroll version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Alias every configuration must define.
pub const DEFAULT_DB_ALIAS: &str = "default";

/// Engine substituted when an alias names no engine.
pub const DUMMY_ENGINE: &str = "dummy";

/// Bare engine prefix; treated the same as a missing engine.
pub const ENGINE_PREFIX: &str = "rawscroll.backends.";

/// Built-in SQLite engine identifier.
pub const SQLITE_ENGINE: &str = "sqlite";

/// Time zone used when `use_tz` is on.
pub const UTC: &str = "UTC";

/// Process-wide time zone when none is configured.
pub const DEFAULT_TIME_ZONE: &str = "UTC";

/// Default rows per page.
pub const DEFAULT_ROWS_PER_PAGE: usize = 25;

/// Default number of addressable pages.
pub const DEFAULT_MAX_PAGES: u64 = 9999;

/// Default max page extent: `DEFAULT_ROWS_PER_PAGE * DEFAULT_MAX_PAGES`.
pub const DEFAULT_MAX_PAGE_EXTENT: u64 = 249_975;

/// Default cap on recorded query-log entries per connection.
pub const DEFAULT_QUERY_LOG_MAX_ENTRIES: usize = 9000;

/// Alias used for the wrapped subquery in count statements.
pub const COUNT_SUBQUERY_ALIAS: &str = "prq1";

/// Environment variable holding log filter directives.
pub const LOG_ENV_VAR: &str = "RAWSCROLL_LOG";

/// Log filter used when `RAWSCROLL_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVES: &str = "rawscroll=info";

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = "rawscroll.toml";
