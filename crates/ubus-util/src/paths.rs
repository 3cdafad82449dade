//! Default paths for ubus client components
//!
//! - Socket: fixed at build time from `UBUS_UNIX_SOCKET`, else `/var/run/ubus/ubus.sock`
//! - Config: `$XDG_CONFIG_HOME/ubus/client.toml` or `~/.config/ubus/client.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path at runtime
pub const UBUS_SOCKET_ENV: &str = "UBUS_SOCKET";

/// Socket path the bus daemon listens on, fixed at build time.
pub const DEFAULT_SOCKET_PATH: &str = match option_env!("UBUS_UNIX_SOCKET") {
    Some(path) => path,
    None => "/var/run/ubus/ubus.sock",
};

/// Application subdirectory name
const APP_DIR: &str = "ubus";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "client.toml";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$UBUS_SOCKET` environment variable (if set)
/// 2. The build-time socket path
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(UBUS_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    compiled_socket_path()
}

/// Get the build-time socket path, ignoring the environment.
pub fn compiled_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/ubus/client.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/ubus/client.toml`
/// 3. `/etc/ubus/client.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}
