//! Configuration validation

use crate::schema::RawConfig;
use std::path::PathBuf;
use thiserror::Error;

/// Accepted `logging.level` values
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bus.socket_path must be absolute: {}", .0.display())]
    RelativeSocketPath(PathBuf),

    #[error("bus.timeout_ms {0} is outside 0..=2147483647")]
    TimeoutOutOfRange(i64),

    #[error("Unknown log level '{0}' (expected trace, debug, info, warn or error)")]
    UnknownLogLevel(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(path) = &config.bus.socket_path {
        if !path.is_absolute() {
            errors.push(ValidationError::RelativeSocketPath(path.clone()));
        }
    }

    if let Some(timeout) = config.bus.timeout_ms {
        if !(0..=i64::from(i32::MAX)).contains(&timeout) {
            errors.push(ValidationError::TimeoutOutOfRange(timeout));
        }
    }

    if let Some(level) = &config.logging.level {
        if !LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ValidationError::UnknownLogLevel(level.clone()));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawBusConfig, RawLoggingConfig};

    fn config(bus: RawBusConfig, logging: RawLoggingConfig) -> RawConfig {
        RawConfig {
            config_version: 1,
            bus,
            logging,
        }
    }

    #[test]
    fn empty_config_is_valid() {
        let raw = config(RawBusConfig::default(), RawLoggingConfig::default());
        assert!(validate_config(&raw).is_empty());
    }

    #[test]
    fn relative_socket_path_is_rejected() {
        let raw = config(
            RawBusConfig {
                socket_path: Some("run/ubus.sock".into()),
                timeout_ms: None,
            },
            RawLoggingConfig::default(),
        );
        assert_eq!(
            validate_config(&raw),
            vec![ValidationError::RelativeSocketPath("run/ubus.sock".into())]
        );
    }

    #[test]
    fn timeout_bounds() {
        for (timeout, ok) in [(0, true), (i64::from(i32::MAX), true), (-1, false), (1 << 31, false)] {
            let raw = config(
                RawBusConfig {
                    socket_path: None,
                    timeout_ms: Some(timeout),
                },
                RawLoggingConfig::default(),
            );
            assert_eq!(validate_config(&raw).is_empty(), ok, "timeout {timeout}");
        }
    }

    #[test]
    fn errors_accumulate() {
        let raw = config(
            RawBusConfig {
                socket_path: Some("relative".into()),
                timeout_ms: Some(-5),
            },
            RawLoggingConfig {
                level: Some("loud".into()),
            },
        );
        assert_eq!(validate_config(&raw).len(), 3);
    }
}
