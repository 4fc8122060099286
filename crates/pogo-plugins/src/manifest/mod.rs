//! Launch descriptions for plugin executables and plugin directory discovery.
//!
//! Plugins are not declared up front. The host scans its plugin directory,
//! turns every executable it finds into a [`PluginManifest`], and lets the
//! handshake decide whether the process really is a plugin. The manifest's
//! identity is the executable path, which is also the registry key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PluginError;

/// Tracing target for discovery.
const DISCOVERY_TARGET: &str = "pogo_plugins::discovery";

/// Default handshake budget in seconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 5;

/// Default per-call budget in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Describes how to launch one plugin executable.
///
/// # Example
///
/// ```
/// use pogo_plugins::PluginManifest;
/// use std::path::PathBuf;
///
/// let manifest = PluginManifest::new(PathBuf::from("/opt/pogo/plugins/search"));
/// assert!(manifest.validate().is_ok());
/// assert_eq!(manifest.identity(), "/opt/pogo/plugins/search");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManifest {
    executable: PathBuf,
    args: Vec<String>,
    handshake_timeout: Duration,
    call_timeout: Duration,
}

impl PluginManifest {
    /// Creates a manifest with default timeouts and no arguments.
    #[must_use]
    pub const fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            args: Vec::new(),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    /// Sets arguments passed to the executable.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Overrides the handshake budget.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Overrides the per-call budget.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Validates the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the executable path is not
    /// absolute or either timeout is zero.
    pub fn validate(&self) -> Result<(), PluginError> {
        if !self.executable.is_absolute() {
            return Err(PluginError::Manifest {
                message: format!(
                    "plugin executable must be an absolute path, got '{}'",
                    self.executable.display()
                ),
            });
        }
        if self.handshake_timeout.is_zero() || self.call_timeout.is_zero() {
            return Err(PluginError::Manifest {
                message: String::from("plugin timeouts must be greater than zero"),
            });
        }
        Ok(())
    }

    /// Registry key: the executable path as text.
    #[must_use]
    pub fn identity(&self) -> String {
        self.executable.to_string_lossy().into_owned()
    }

    /// Absolute path to the executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Handshake budget.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Per-call budget.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }
}

/// Lists the plugin candidates in `dir`, sorted by path.
///
/// Only regular files are considered; on Unix they must also carry an
/// execute bit. A missing directory yields an empty list. A relative `dir`
/// is resolved against the working directory, so every returned path is
/// absolute.
///
/// # Errors
///
/// Returns [`PluginError::Discovery`] when the directory exists but cannot be
/// read.
pub fn discover_plugins(dir: &Path) -> Result<Vec<PathBuf>, PluginError> {
    let base = std::path::absolute(dir).map_err(|error| discovery_error(dir, error))?;
    let entries = match fs::read_dir(&base) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            warn!(
                target: DISCOVERY_TARGET,
                dir = %base.display(),
                "plugin directory does not exist"
            );
            return Ok(Vec::new());
        }
        Err(error) => return Err(discovery_error(&base, error)),
    };

    let mut found = Vec::new();
    for item in entries {
        let entry = item.map_err(|error| discovery_error(&base, error))?;
        let path = entry.path();
        // Follow symlinks so linked plugin binaries are picked up.
        let Ok(metadata) = fs::metadata(&path) else {
            debug!(target: DISCOVERY_TARGET, path = %path.display(), "skipping unreadable entry");
            continue;
        };
        if metadata.is_file() && is_executable(&metadata) {
            found.push(path);
        } else {
            debug!(target: DISCOVERY_TARGET, path = %path.display(), "skipping non-executable entry");
        }
    }
    found.sort();
    debug!(target: DISCOVERY_TARGET, dir = %base.display(), count = found.len(), "discovered plugins");
    Ok(found)
}

fn discovery_error(dir: &Path, error: io::Error) -> PluginError {
    PluginError::Discovery {
        path: dir.to_path_buf(),
        source: Arc::new(error),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
const fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}
