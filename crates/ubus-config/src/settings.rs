//! Validated settings

use std::path::PathBuf;
use ubus_util::compiled_socket_path;

use crate::schema::RawConfig;

/// Default call timeout
pub const DEFAULT_TIMEOUT_MS: i64 = 30_000;

/// Default log filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings ready for use by the command-line client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub socket_path: PathBuf,
    pub timeout_ms: i64,
    pub log_level: String,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            socket_path: raw.bus.socket_path.unwrap_or(defaults.socket_path),
            timeout_ms: raw.bus.timeout_ms.unwrap_or(defaults.timeout_ms),
            log_level: raw.logging.level.unwrap_or(defaults.log_level),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket_path: compiled_socket_path(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
