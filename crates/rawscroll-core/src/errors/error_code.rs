//! ErrorCode trait for structured error reporting.

/// Every error enum implements this to give log events and callers a stable
/// code string independent of the human-readable message.
pub trait ErrorCode {
    /// Returns the code string (e.g., "INVALID_QUERY").
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CONFIG_NOT_FOUND: &str = "CONFIG_NOT_FOUND";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const CONNECTION_DOES_NOT_EXIST: &str = "CONNECTION_DOES_NOT_EXIST";
pub const BACKEND_NOT_FOUND: &str = "BACKEND_NOT_FOUND";
pub const IMPROPERLY_CONFIGURED: &str = "IMPROPERLY_CONFIGURED";
pub const SCROLL_OUT_OF_RANGE: &str = "SCROLL_OUT_OF_RANGE";
pub const CURSOR_STATE: &str = "CURSOR_STATE";
pub const COLUMN_RESOLUTION_ERROR: &str = "COLUMN_RESOLUTION_ERROR";
pub const UNSUPPORTED_INDEX: &str = "UNSUPPORTED_INDEX";
pub const INVALID_QUERY: &str = "INVALID_QUERY";
pub const FIELD_ERROR: &str = "FIELD_ERROR";
pub const INVALID_PAGE: &str = "INVALID_PAGE";
