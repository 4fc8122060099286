//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use pogo_config::{Config, ConfigValueError};
use pogo_plugins::client::PluginLauncher;
use pogo_plugins::{HostSettings, PluginError, PluginHost};

use crate::health::HealthReporter;
use crate::shutdown::{ShutdownError, ShutdownSignal};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any configuration layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that layers defaults, config file, environment, and CLI flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The configured plugin API range is unusable.
    #[error("invalid plugin API requirement: {source}")]
    ApiVersion {
        /// Parser error.
        #[source]
        source: ConfigValueError,
    },
    /// A plugin timeout is unusable.
    #[error("invalid plugin timeout: {source}")]
    Timeouts {
        /// Validation error.
        #[source]
        source: ConfigValueError,
    },
    /// The plugin directory could not be scanned.
    #[error("failed to initialise plugins: {source}")]
    Plugins {
        /// Host error.
        #[source]
        source: PluginError,
    },
}

/// A bootstrapped daemon owning the plugin host.
///
/// Dropping the daemon kills every plugin.
pub struct Daemon<L> {
    config: Config,
    host: PluginHost<L>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl<L> std::fmt::Debug for Daemon<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("plugins", &self.host.get_plugin_paths())
            .finish_non_exhaustive()
    }
}

impl<L> Daemon<L> {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The plugin host.
    #[must_use]
    pub const fn host(&self) -> &PluginHost<L> {
        &self.host
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Blocks on `signal`, then kills every plugin.
    ///
    /// Plugins are killed even when the signal listener fails.
    ///
    /// # Errors
    ///
    /// Returns the listener's [`ShutdownError`].
    pub fn run_until(&self, signal: &dyn ShutdownSignal) -> Result<(), ShutdownError> {
        let waited = signal.wait();
        self.shutdown();
        waited
    }

    /// Kills every plugin. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.reporter.shutdown_starting();
        self.host.kill();
        self.reporter.shutdown_completed();
    }
}

/// Bootstraps the daemon: configuration, telemetry, then plugin discovery.
///
/// Individual plugins that fail to load are logged by the host and do not
/// fail bootstrap.
///
/// # Errors
///
/// Returns a [`BootstrapError`] for the first stage that fails. The reporter
/// is told about the failure before it is returned.
pub fn bootstrap_with<L>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    launcher: L,
) -> Result<Daemon<L>, BootstrapError>
where
    L: PluginLauncher,
{
    reporter.bootstrap_starting();
    match prepare(loader, launcher) {
        Ok((config, host, telemetry)) => {
            reporter.bootstrap_succeeded(&config, &host.get_plugin_paths());
            Ok(Daemon {
                config,
                host,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare<L>(
    loader: &dyn ConfigLoader,
    launcher: L,
) -> Result<(Config, PluginHost<L>, TelemetryHandle), BootstrapError>
where
    L: PluginLauncher,
{
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let api_version = config
        .api_version_req()
        .map_err(|source| BootstrapError::ApiVersion { source })?;
    config
        .check_timeouts()
        .map_err(|source| BootstrapError::Timeouts { source })?;

    let settings = HostSettings::new(config.plugin_dir().as_std_path(), api_version)
        .with_handshake_timeout(config.handshake_timeout())
        .with_call_timeout(config.call_timeout());
    let host = PluginHost::new(settings, launcher);
    host.init()
        .map_err(|source| BootstrapError::Plugins { source })?;
    Ok((config, host, telemetry))
}
