//! ws-echo-probe: poke a device over a WebSocket
//!
//! Two modes:
//! - `probe` (default): connect to an endpoint, send numbered greetings,
//!   print each echo, pause between iterations, run until Ctrl-C
//! - `serve`: run a local `/ws` echo endpoint that behaves like the device
//!
//! Configuration via CLI arguments or TOML file.

mod config;
mod error;
mod probe;
mod protocols;
mod server;

use config::{Config, Mode};
use error::ProbeError;
use probe::report::Console;
use probe::{EchoProbe, Outcome};
use server::Server;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match config.mode {
        Mode::Probe => runtime.block_on(run_probe(config)),
        Mode::Serve => runtime.block_on(run_server(config)),
    }
}

/// Run the probe until interrupted
async fn run_probe(config: Config) -> ExitCode {
    info!(
        endpoint = %config.probe.endpoint,
        interval = ?config.probe.interval,
        max_messages = ?config.probe.max_messages,
        "Starting echo probe"
    );

    let probe = EchoProbe::new(config.probe);
    let result = probe.run(&mut Console, interrupted()).await;
    ExitCode::from(exit_status(&result))
}

/// Process exit status for a finished probe run.
///
/// Errors have already been reported by the console.
fn exit_status(result: &Result<Outcome, ProbeError>) -> u8 {
    match result {
        Ok(Outcome::Stopped) | Ok(Outcome::Completed { .. }) => 0,
        Err(_) => 1,
    }
}

/// Run the local echo endpoint until interrupted
async fn run_server(config: Config) -> ExitCode {
    info!(
        listen = %config.server.listen,
        max_connections = config.server.max_connections,
        "Starting echo endpoint"
    );

    let server = Server::new(&config.server);
    match server.run(interrupted()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
