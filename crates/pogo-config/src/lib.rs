//! Shared configuration for the pogo daemon and its plugin host.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `POGO_*` environment variables, then command line
//! flags. The resolved [`Config`] tells the daemon where to discover plugin
//! binaries, how long to wait on plugin handshakes and calls, which plugin API
//! revisions it accepts, and how to format its own logs.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_API_VERSION, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_HANDSHAKE_TIMEOUT_SECS,
    DEFAULT_LOG_FILTER, default_api_version, default_call_timeout_secs,
    default_handshake_timeout_secs, default_log_filter, default_log_filter_string,
    default_log_format, default_plugin_dir,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for `pogod`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "POGO")]
pub struct Config {
    /// Directory scanned for plugin executables at startup.
    #[serde(default = "default_plugin_dir")]
    plugin_dir: Utf8PathBuf,
    /// Seconds to wait for a spawned plugin to complete its handshake.
    #[serde(default = "default_handshake_timeout_secs")]
    handshake_timeout_secs: u64,
    /// Seconds to wait for a single plugin call to answer.
    #[serde(default = "default_call_timeout_secs")]
    call_timeout_secs: u64,
    /// Semver range of plugin API versions the host accepts.
    #[serde(default = "default_api_version")]
    api_version: String,
    /// `tracing` filter expression for daemon logs.
    #[serde(default = "default_log_filter_string")]
    log_filter: String,
    /// Output format for daemon logs.
    #[serde(default = "default_log_format")]
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            api_version: default_api_version(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Errors raised while interpreting configured values.
#[derive(Debug, Error)]
pub enum ConfigValueError {
    /// The configured API version range is not a valid semver requirement.
    #[error("invalid api_version requirement '{value}': {source}")]
    ApiVersion {
        /// Value as configured.
        value: String,
        /// Parser error.
        #[source]
        source: semver::Error,
    },
    /// A timeout is configured as zero seconds.
    #[error("{setting} must be greater than zero")]
    ZeroTimeout {
        /// Name of the offending setting.
        setting: &'static str,
    },
}

impl Config {
    /// Overrides the plugin directory.
    #[must_use]
    pub fn with_plugin_dir(mut self, plugin_dir: impl Into<Utf8PathBuf>) -> Self {
        self.plugin_dir = plugin_dir.into();
        self
    }

    /// Overrides the handshake timeout.
    #[must_use]
    pub const fn with_handshake_timeout_secs(mut self, secs: u64) -> Self {
        self.handshake_timeout_secs = secs;
        self
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub const fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Overrides the accepted plugin API version range.
    #[must_use]
    pub fn with_api_version(mut self, requirement: impl Into<String>) -> Self {
        self.api_version = requirement.into();
        self
    }

    /// Overrides the log filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Directory scanned for plugin executables.
    #[must_use]
    pub fn plugin_dir(&self) -> &Utf8Path {
        self.plugin_dir.as_path()
    }

    /// Time allowed for a plugin handshake.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Time allowed for one plugin call.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Raw API version requirement as configured.
    #[must_use]
    pub fn api_version(&self) -> &str {
        self.api_version.as_str()
    }

    /// Parses the configured API version requirement.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValueError::ApiVersion`] when the value is not a valid
    /// semver requirement.
    pub fn api_version_req(&self) -> Result<VersionReq, ConfigValueError> {
        VersionReq::parse(&self.api_version).map_err(|source| ConfigValueError::ApiVersion {
            value: self.api_version.clone(),
            source,
        })
    }

    /// Checks that both plugin timeouts allow some time to elapse.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValueError::ZeroTimeout`] naming the first zero
    /// timeout.
    pub const fn check_timeouts(&self) -> Result<(), ConfigValueError> {
        if self.handshake_timeout_secs == 0 {
            return Err(ConfigValueError::ZeroTimeout {
                setting: "handshake_timeout_secs",
            });
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigValueError::ZeroTimeout {
                setting: "call_timeout_secs",
            });
        }
        Ok(())
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
