//! Per-alias database configuration and the defaults resolver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DUMMY_ENGINE, ENGINE_PREFIX};

/// One `[databases.<alias>]` entry as written in TOML. Every key is optional;
/// `apply_defaults` fills in the rest before a backend ever sees it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub engine: Option<String>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub time_zone: Option<String>,
    pub options: Option<BTreeMap<String, String>>,
    pub test_charset: Option<String>,
    pub test_collation: Option<String>,
    pub test_name: Option<String>,
    pub test_mirror: Option<String>,
}

impl DatabaseConfig {
    /// Convenience constructor for an engine + name pair.
    pub fn new(engine: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            engine: Some(engine.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Fill every missing key in place.
    ///
    /// An absent, empty, or bare-prefix engine becomes the dummy engine and a
    /// fully qualified `rawscroll.backends.<x>` engine is shortened to `<x>`.
    /// String settings default to `""`. The `test_*` settings are left `None`,
    /// which is the "unset" marker and differs from an explicit `""`.
    pub fn apply_defaults(&mut self, default_time_zone: &str) {
        let engine = match self.engine.as_deref().map(str::trim) {
            None | Some("") => DUMMY_ENGINE.to_string(),
            Some(e) if e == ENGINE_PREFIX || e == ENGINE_PREFIX.trim_end_matches('.') => {
                DUMMY_ENGINE.to_string()
            }
            Some(e) => e.strip_prefix(ENGINE_PREFIX).unwrap_or(e).to_string(),
        };
        self.engine = Some(engine);
        self.options.get_or_insert_with(BTreeMap::new);
        self.time_zone
            .get_or_insert_with(|| default_time_zone.to_string());
        for setting in [
            &mut self.name,
            &mut self.user,
            &mut self.password,
            &mut self.host,
            &mut self.port,
        ] {
            setting.get_or_insert_with(String::new);
        }
    }

    /// Convert into resolved settings. Call `apply_defaults` first; anything
    /// still missing resolves to the same values `apply_defaults` would use.
    pub fn into_settings(mut self, default_time_zone: &str) -> ConnectionSettings {
        self.apply_defaults(default_time_zone);
        ConnectionSettings {
            engine: self.engine.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            user: self.user.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            host: self.host.unwrap_or_default(),
            port: self.port.unwrap_or_default(),
            time_zone: self.time_zone.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
            test: TestSettings {
                charset: self.test_charset,
                collation: self.test_collation,
                name: self.test_name,
                mirror: self.test_mirror,
            },
        }
    }
}

/// Test-database settings. `None` means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSettings {
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub name: Option<String>,
    pub mirror: Option<String>,
}

/// Fully resolved settings handed to a backend loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub engine: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub time_zone: String,
    pub options: BTreeMap<String, String>,
    pub test: TestSettings,
}
