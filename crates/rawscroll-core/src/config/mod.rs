//! Configuration system for rawscroll.
//! TOML-based, 4-layer resolution: overrides > env > project > user > defaults.

pub mod database_config;
pub mod paging_config;
pub mod query_log_config;
pub mod rawscroll_config;

pub use database_config::{ConnectionSettings, DatabaseConfig, TestSettings};
pub use paging_config::PagingConfig;
pub use query_log_config::QueryLogConfig;
pub use rawscroll_config::{ConfigOverrides, RawScrollConfig};
