//! Configuration errors.

use super::error_code::{self, ErrorCode};

/// Errors that can occur during configuration loading, validation, and
/// per-alias defaults resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Config validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Invalid config value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("The connection {alias} doesn't exist")]
    ConfigNotFound { alias: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } => error_code::CONFIG_NOT_FOUND,
            _ => error_code::CONFIG_ERROR,
        }
    }
}
