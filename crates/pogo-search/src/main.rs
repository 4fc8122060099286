//! `pogo-search` plugin binary.
//!
//! Launched by the pogo host, never directly. Logs are JSON on stderr, which
//! the host captures; stdout carries the plugin protocol only.

use std::io::{self, Write};
use std::process::ExitCode;

use pogo_plugins::{HandshakeConfig, ServeError, serve};
use pogo_search::BasicSearch;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the plugin's log filter.
const LOG_ENV: &str = "POGO_SEARCH_LOG";

fn main() -> ExitCode {
    let handshake = HandshakeConfig::search();
    if let Err(err) = handshake.check_environment() {
        // Not launched by a host: say so plainly instead of logging JSON.
        drop(writeln!(io::stderr().lock(), "{err}"));
        return ExitCode::FAILURE;
    }

    install_logging();
    info!(target: "pogo_search", version = pogo_search::API_VERSION, "search plugin starting");

    let plugin = BasicSearch::new();
    match serve(&plugin, &handshake) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ ServeError::Handshake(_)) => {
            error!(target: "pogo_search", error = %err, "refusing to serve");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(target: "pogo_search", error = %err, "plugin channel failed");
            ExitCode::FAILURE
        }
    }
}

fn install_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("debug"));
    let installed = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .flatten_event(true)
        .try_init();
    if let Err(err) = installed {
        drop(writeln!(io::stderr().lock(), "failed to install logging: {err}"));
    }
}
