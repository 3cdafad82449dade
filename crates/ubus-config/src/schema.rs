//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub bus: RawBusConfig,

    #[serde(default)]
    pub logging: RawLoggingConfig,
}

/// Bus connection settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawBusConfig {
    /// Daemon socket (default: the build-time path)
    pub socket_path: Option<PathBuf>,

    /// Default call timeout in milliseconds, 0 waits forever
    pub timeout_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawLoggingConfig {
    /// trace, debug, info, warn or error
    pub level: Option<String>,
}
