use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};

use mouse_commander::{capture, logging, Host, HostConfig};

/// Native messaging host for the Mouse Commander extension.
///
/// Started by the browser, not by hand: it speaks the native messaging protocol on
/// stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "mouse-commander-host", version)]
struct Cli {
    /// TOML config file overriding the built-in defaults.
    #[arg(long, env = "MOUSE_COMMANDER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Calling window handle (Chrome on Windows).
    #[arg(long, value_name = "HWND")]
    parent_window: Option<String>,

    /// What the browser passes to identify the caller: the extension origin
    /// (Chromium) or the manifest path and extension id (Firefox).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    caller: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match HostConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("mouse-commander-host: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = logging::init(&config.log) {
        eprintln!("mouse-commander-host: logging unavailable: {err}");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "native host starting");
    debug!(caller = ?cli.caller, parent_window = ?cli.parent_window, "launched");

    let host = Host::new(config, capture::system_hook(), io::stdout());
    match host.run(io::stdin()).await {
        Ok(exit) => {
            info!(?exit, "native host exiting");
            ExitCode::from(exit.exit_code())
        }
        Err(err) => {
            error!(%err, "native host failed to start");
            ExitCode::FAILURE
        }
    }
}
