//! Check a client configuration file before deploying it.
//!
//! `ubus-validate-config [FILE]` validates FILE, or the per-user config when
//! no file is given. Exits 0 when the file is valid, 1 otherwise, 2 on bad
//! usage.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use ubus_config::{ConfigError, Settings, CURRENT_CONFIG_VERSION};
use ubus_util::default_config_path;

/// Lines describing the effective settings of a valid file
fn describe(settings: &Settings) -> Vec<String> {
    vec![
        format!("config_version = {CURRENT_CONFIG_VERSION}"),
        format!("socket_path    = {}", settings.socket_path.display()),
        format!("timeout_ms     = {}", settings.timeout_ms),
        format!("log_level      = {}", settings.log_level),
    ]
}

/// Validate `path`, returning the settings summary or one line per problem
fn check(path: &Path) -> Result<Vec<String>, Vec<String>> {
    if !path.is_file() {
        return Err(vec![format!("{}: no such file", path.display())]);
    }

    match ubus_config::load_config(path) {
        Ok(settings) => Ok(describe(&settings)),
        Err(ConfigError::ValidationFailed { errors }) => Err(errors
            .iter()
            .map(|err| format!("{}: {err}", path.display()))
            .collect()),
        Err(ConfigError::UnsupportedVersion(version)) => Err(vec![format!(
            "{}: config_version {version} is not supported (this build reads {CURRENT_CONFIG_VERSION})",
            path.display()
        )]),
        Err(err) => Err(vec![format!("{}: {err}", path.display())]),
    }
}

fn main() -> ExitCode {
    let mut args = std::env::args_os().skip(1);
    let path = args.next().map(PathBuf::from).unwrap_or_else(default_config_path);
    if args.next().is_some() {
        eprintln!("usage: ubus-validate-config [FILE]");
        return ExitCode::from(2);
    }

    match check(&path) {
        Ok(summary) => {
            println!("{}: ok", path.display());
            for line in summary {
                println!("  {line}");
            }
            ExitCode::SUCCESS
        }
        Err(problems) => {
            for line in problems {
                eprintln!("{line}");
            }
            ExitCode::from(1)
        }
    }
}
