//! ubus-call - call a method on a ubus object from the command line
//!
//! Connects, issues one call, prints every response message as JSON on
//! stdout, then disconnects. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use nix::sys::stat::stat;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use ubus_config::{load_config, load_config_or_default, Settings};
use ubus_core::{from_json_text, to_json, HostValue, UbusClient};
use ubus_libubus::LibUbus;
use ubus_util::{default_config_path, UbusError};

/// ubus-call - call a method on a ubus object
#[derive(Parser, Debug)]
#[command(name = "ubus-call")]
#[command(about = "Call a method on a ubus object and print the responses", long_about = None)]
struct Args {
    /// Object path, e.g. `system`
    service: String,

    /// Method name, e.g. `board`
    method: String,

    /// Call argument as a JSON object
    #[arg(default_value = "{}")]
    message: String,

    /// Configuration file path (default: ~/.config/ubus/client.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket path override (or set UBUS_SOCKET env var)
    #[arg(short, long, env = "UBUS_SOCKET")]
    socket: Option<PathBuf>,

    /// Call timeout in milliseconds, 0 waits forever
    #[arg(short, long, allow_negative_numbers = true)]
    timeout: Option<i64>,

    /// Log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print each response on a single line
    #[arg(long)]
    compact: bool,
}

fn load_settings(args: &Args) -> Result<Settings> {
    match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let path = default_config_path();
            load_config_or_default(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
    }
}

/// The daemon socket must exist before libubus is asked to connect to it
fn check_socket(path: &Path) -> Result<(), UbusError> {
    stat(path).map(|_| ()).map_err(UbusError::from)
}

fn print_response(response: &HostValue, compact: bool) -> Result<()> {
    let json = to_json(response)?;
    let text = if compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{text}");
    Ok(())
}

fn run(args: &Args, settings: &Settings) -> Result<()> {
    let socket = args
        .socket
        .clone()
        .unwrap_or_else(|| settings.socket_path.clone());
    let timeout_ms = args.timeout.unwrap_or(settings.timeout_ms);
    let message = from_json_text(&args.message).context("Invalid JSON argument")?;

    check_socket(&socket)
        .with_context(|| format!("Cannot access ubus socket {}", socket.display()))?;

    let mut client = UbusClient::with_socket_path(LibUbus::new(), socket);
    client.connect().context("Failed to connect to ubus")?;

    let result = client.call(&args.service, &args.method, &message, timeout_ms);
    client.disconnect()?;

    let responses = result
        .with_context(|| format!("Call to {}.{} failed", args.service, args.method))?;
    debug!(count = responses.len(), "Call returned");

    for response in &responses {
        print_response(response, args.compact)?;
    }

    info!(
        service = %args.service,
        method = %args.method,
        responses = responses.len(),
        "Call complete"
    );
    Ok(())
}

/// Process exit status for a failed run: the bus status for failed
/// invocations, the errno for OS-shaped errors, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    let code = match err.downcast_ref::<UbusError>() {
        Some(UbusError::Invocation(status)) => Some(status.code()),
        Some(e) => e.errno(),
        None => None,
    };
    code.and_then(|c| u8::try_from(c).ok())
        .filter(|&c| c != 0)
        .unwrap_or(1)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(1);
        }
    };

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&settings.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(&args, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
