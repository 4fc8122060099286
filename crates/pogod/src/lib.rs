//! Bootstrap logic for the pogo daemon.
//!
//! `pogod` loads its layered configuration, installs structured telemetry,
//! and starts a [`PluginHost`](pogo_plugins::PluginHost) that discovers and
//! handshakes every plugin binary in the configured plugin directory. It then
//! blocks until a termination signal arrives and kills every plugin before
//! exiting, so no plugin process outlives the daemon.
//!
//! Each stage reports through a [`HealthReporter`] so operators can see where
//! a failed start stopped.

mod bootstrap;
mod health;
mod shutdown;
mod telemetry;

use std::sync::Arc;

use pogo_plugins::process::ProcessLauncher;
use thiserror::Error;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

/// Errors that end a daemon run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The daemon failed to start.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The shutdown listener failed; plugins were still killed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Runs the daemon with process-backed plugins until `signal` fires.
///
/// # Errors
///
/// Returns [`RunError::Bootstrap`] when startup fails and
/// [`RunError::Shutdown`] when the signal listener cannot be installed.
pub fn run(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    signal: &dyn ShutdownSignal,
) -> Result<(), RunError> {
    let daemon = bootstrap_with(loader, reporter, ProcessLauncher)?;
    daemon.run_until(signal)?;
    Ok(())
}

#[cfg(test)]
mod tests;
