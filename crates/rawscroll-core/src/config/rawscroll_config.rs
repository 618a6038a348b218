//! Top-level rawscroll configuration with 4-layer resolution.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConnectionSettings, DatabaseConfig, PagingConfig, QueryLogConfig};
use crate::constants::{DEFAULT_DB_ALIAS, DEFAULT_TIME_ZONE, PROJECT_CONFIG_FILE, UTC};
use crate::errors::ConfigError;

/// Top-level configuration.
///
/// Resolution order (highest priority first):
/// 1. Explicit overrides (applied via `apply_overrides`)
/// 2. Environment variables (`RAWSCROLL_*`)
/// 3. Project config (`rawscroll.toml` in project root)
/// 4. User config (`~/.rawscroll/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawScrollConfig {
    /// Alias used when a query names none. Default: "default".
    pub default_alias: Option<String>,
    /// Whether the process is time-zone aware. Default: true.
    pub use_tz: Option<bool>,
    /// Process-wide time zone used when `use_tz` is off. Default: "UTC".
    pub time_zone: Option<String>,
    /// Prefer a backend's server-side cursor wrapper when it has one. Default: true.
    pub use_server_side_cursors: Option<bool>,
    pub paging: PagingConfig,
    pub query_log: QueryLogConfig,
    pub databases: BTreeMap<String, DatabaseConfig>,
}

/// Explicit override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub default_alias: Option<String>,
    pub use_server_side_cursors: Option<bool>,
    pub rows_per_page: Option<usize>,
    pub max_pages: Option<u64>,
}

impl RawScrollConfig {
    /// Load configuration with 4-layer resolution.
    pub fn load(root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Layer 4 (lowest priority): user config
        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(ConfigError::ParseError { .. }) => {
                        return Err(ConfigError::ParseError {
                            path: user_config_path.display().to_string(),
                            message: "invalid TOML in user config".to_string(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        // Layer 3: project config
        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        // Layer 2: environment variables
        Self::apply_env_overrides(&mut config);

        // Layer 1 (highest priority): explicit overrides
        if let Some(o) = overrides {
            Self::apply_overrides(&mut config, o);
        }

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing). Validated.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Builder-style helper: add or replace a database alias.
    pub fn with_database(mut self, alias: impl Into<String>, db: DatabaseConfig) -> Self {
        self.databases.insert(alias.into(), db);
        self
    }

    /// Validate the configuration values.
    pub fn validate(config: &RawScrollConfig) -> Result<(), ConfigError> {
        let alias = config.effective_default_alias();
        if !config.databases.contains_key(alias) {
            return Err(ConfigError::ValidationFailed {
                field: "databases".to_string(),
                message: format!("you must define a '{alias}' database"),
            });
        }
        if config.paging.rows_per_page == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "paging.rows_per_page".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.paging.max_pages == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "paging.max_pages".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn effective_default_alias(&self) -> &str {
        self.default_alias.as_deref().unwrap_or(DEFAULT_DB_ALIAS)
    }

    pub fn effective_use_tz(&self) -> bool {
        self.use_tz.unwrap_or(true)
    }

    pub fn effective_use_server_side_cursors(&self) -> bool {
        self.use_server_side_cursors.unwrap_or(true)
    }

    /// Time zone a connection gets when its entry names none.
    pub fn connection_time_zone(&self) -> &str {
        if self.effective_use_tz() {
            UTC
        } else {
            self.time_zone.as_deref().unwrap_or(DEFAULT_TIME_ZONE)
        }
    }

    /// Iterate configured aliases in a stable order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.databases.keys().map(String::as_str)
    }

    /// Resolve an alias into fully populated connection settings.
    ///
    /// Fails with `ConfigNotFound` when the alias is not configured.
    pub fn ensure_defaults(&self, alias: &str) -> Result<ConnectionSettings, ConfigError> {
        let entry = self
            .databases
            .get(alias)
            .ok_or_else(|| ConfigError::ConfigNotFound {
                alias: alias.to_string(),
            })?;
        Ok(entry.clone().into_settings(self.connection_time_zone()))
    }

    /// Returns the user config path: `~/.rawscroll/config.toml`.
    fn user_config_path() -> Option<std::path::PathBuf> {
        dirs_path().map(|d| d.join("config.toml"))
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut RawScrollConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: RawScrollConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`. Scalars override only when `other` has a
    /// `Some`; database entries replace same-named aliases wholesale.
    fn merge(base: &mut RawScrollConfig, other: &RawScrollConfig) {
        if other.default_alias.is_some() {
            base.default_alias = other.default_alias.clone();
        }
        if other.use_tz.is_some() {
            base.use_tz = other.use_tz;
        }
        if other.time_zone.is_some() {
            base.time_zone = other.time_zone.clone();
        }
        if other.use_server_side_cursors.is_some() {
            base.use_server_side_cursors = other.use_server_side_cursors;
        }

        // Paging
        if other.paging.rows_per_page.is_some() {
            base.paging.rows_per_page = other.paging.rows_per_page;
        }
        if other.paging.max_pages.is_some() {
            base.paging.max_pages = other.paging.max_pages;
        }

        // Query log
        if other.query_log.enabled.is_some() {
            base.query_log.enabled = other.query_log.enabled;
        }
        if other.query_log.max_entries.is_some() {
            base.query_log.max_entries = other.query_log.max_entries;
        }

        for (alias, db) in &other.databases {
            base.databases.insert(alias.clone(), db.clone());
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `RAWSCROLL_ROWS_PER_PAGE`, `RAWSCROLL_MAX_PAGES`, etc.
    fn apply_env_overrides(config: &mut RawScrollConfig) {
        if let Ok(val) = std::env::var("RAWSCROLL_DEFAULT_ALIAS") {
            if !val.is_empty() {
                config.default_alias = Some(val);
            }
        }
        if let Ok(val) = std::env::var("RAWSCROLL_USE_SERVER_SIDE_CURSORS") {
            if let Ok(v) = val.parse::<bool>() {
                config.use_server_side_cursors = Some(v);
            }
        }
        if let Ok(val) = std::env::var("RAWSCROLL_ROWS_PER_PAGE") {
            if let Ok(v) = val.parse::<usize>() {
                config.paging.rows_per_page = Some(v);
            }
        }
        if let Ok(val) = std::env::var("RAWSCROLL_MAX_PAGES") {
            if let Ok(v) = val.parse::<u64>() {
                config.paging.max_pages = Some(v);
            }
        }
        if let Ok(val) = std::env::var("RAWSCROLL_QUERY_LOG") {
            if let Ok(v) = val.parse::<bool>() {
                config.query_log.enabled = Some(v);
            }
        }
    }

    /// Apply explicit overrides (highest priority).
    fn apply_overrides(config: &mut RawScrollConfig, o: &ConfigOverrides) {
        if let Some(ref v) = o.default_alias {
            config.default_alias = Some(v.clone());
        }
        if let Some(v) = o.use_server_side_cursors {
            config.use_server_side_cursors = Some(v);
        }
        if let Some(v) = o.rows_per_page {
            config.paging.rows_per_page = Some(v);
        }
        if let Some(v) = o.max_pages {
            config.paging.max_pages = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

/// Returns the user-level config directory: `~/.rawscroll/`.
fn dirs_path() -> Option<std::path::PathBuf> {
    home_dir().map(|h| h.join(".rawscroll"))
}

/// Cross-platform home directory resolution.
fn home_dir() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(std::path::PathBuf::from)
}
