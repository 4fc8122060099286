//! The plugin host: discovery, launch, lookup and teardown.
//!
//! [`PluginHost`] scans its plugin directory, launches every candidate
//! through a [`PluginLauncher`], checks the reported API version, and keeps
//! the survivors in a [`PluginRegistry`]. A candidate that fails to start,
//! handshake or pass the version check is logged and left out; it never
//! prevents the others from loading and is not retried.
//!
//! The registry is written only by [`PluginHost::init`] and
//! [`PluginHost::kill`]. Lookups and calls take a read lock just long enough
//! to clone the plugin's handle, so calls to different plugins run in
//! parallel and a slow call never blocks teardown.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use semver::VersionReq;
use tracing::{debug, error, info, warn};

use crate::capability::{PluginInfo, ProcessProjectRequest};
use crate::client::{PluginClient, PluginLauncher};
use crate::error::PluginError;
use crate::handshake::HandshakeConfig;
use crate::manifest::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_HANDSHAKE_TIMEOUT_SECS, PluginManifest, discover_plugins,
};
use crate::registry::{PluginHandle, PluginRegistry};

/// Tracing target for host operations.
const HOST_TARGET: &str = "pogo_plugins::host";

/// Settings that govern how the host loads plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    plugin_dir: PathBuf,
    handshake: HandshakeConfig,
    api_version: VersionReq,
    handshake_timeout: Duration,
    call_timeout: Duration,
}

impl HostSettings {
    /// Creates settings for search plugins in `plugin_dir` that must satisfy
    /// `api_version`.
    #[must_use]
    pub fn new(plugin_dir: impl Into<PathBuf>, api_version: VersionReq) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            handshake: HandshakeConfig::search(),
            api_version,
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    /// Overrides the handshake plugins must answer with.
    #[must_use]
    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
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

    /// Directory scanned for plugins.
    #[must_use]
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Expected handshake.
    #[must_use]
    pub const fn handshake(&self) -> &HandshakeConfig {
        &self.handshake
    }

    /// Accepted plugin API versions.
    #[must_use]
    pub const fn api_version(&self) -> &VersionReq {
        &self.api_version
    }

    fn manifest_for(&self, executable: PathBuf) -> PluginManifest {
        PluginManifest::new(executable)
            .with_handshake_timeout(self.handshake_timeout)
            .with_call_timeout(self.call_timeout)
    }
}

#[derive(Debug, Default)]
struct HostState {
    initialised: bool,
    registry: PluginRegistry,
}

/// Owns every running plugin process.
///
/// # Example
///
/// ```no_run
/// use pogo_plugins::host::{HostSettings, PluginHost};
/// use pogo_plugins::process::ProcessLauncher;
/// use semver::VersionReq;
///
/// let api = VersionReq::parse(">=0.0.1, <0.1.0").expect("valid range");
/// let host = PluginHost::new(HostSettings::new("/opt/pogo/plugins", api), ProcessLauncher);
/// host.init().expect("plugin directory readable");
/// for path in host.get_plugin_paths() {
///     println!("{path}");
/// }
/// host.kill();
/// ```
#[derive(Debug)]
pub struct PluginHost<L> {
    settings: HostSettings,
    launcher: L,
    state: RwLock<HostState>,
}

impl<L> PluginHost<L> {
    /// Creates a host that has not loaded anything yet.
    #[must_use]
    pub fn new(settings: HostSettings, launcher: L) -> Self {
        Self {
            settings,
            launcher,
            state: RwLock::new(HostState::default()),
        }
    }

    /// Host settings.
    #[must_use]
    pub const fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// Launcher used to start plugins.
    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Paths of every successfully loaded plugin, in ascending order.
    #[must_use]
    pub fn get_plugin_paths(&self) -> Vec<String> {
        self.read_state().registry.paths()
    }

    /// Looks up a loaded plugin.
    #[must_use]
    pub fn get_plugin(&self, path: &str) -> Option<Arc<PluginHandle>> {
        self.read_state().registry.get(path)
    }

    /// Calls the plugin's `info` capability.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown paths, otherwise the
    /// call's failure.
    pub fn get_plugin_info(&self, path: &str) -> Result<PluginInfo, PluginError> {
        self.require(path)?.client().info()
    }

    /// Forwards an escaped request to the plugin and returns its escaped
    /// response untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] for unknown paths, otherwise the
    /// call's failure.
    pub fn execute(&self, path: &str, request: &str) -> Result<String, PluginError> {
        let handle = self.require(path)?;
        debug!(
            target: HOST_TARGET,
            plugin = path,
            request_bytes = request.len(),
            "forwarding execute"
        );
        handle.client().execute(request)
    }

    /// Asks every loaded plugin to track `project_root`.
    ///
    /// Individual failures are logged. Returns the number of plugins that
    /// accepted the project.
    #[must_use]
    pub fn process_project(&self, project_root: &str) -> usize {
        let handles = self.read_state().registry.handles();
        let request = ProcessProjectRequest::new(project_root);
        let mut accepted = 0;
        for handle in handles {
            match handle.client().process_project(&request) {
                Ok(()) => accepted += 1,
                Err(err) => warn!(
                    target: HOST_TARGET,
                    plugin = handle.path(),
                    project = project_root,
                    error = %err,
                    "plugin rejected project"
                ),
            }
        }
        accepted
    }

    /// Terminates every plugin process. Safe to call repeatedly.
    pub fn kill(&self) {
        let handles = {
            let mut state = self.write_state();
            state.initialised = false;
            state.registry.drain()
        };
        for handle in handles {
            debug!(target: HOST_TARGET, plugin = handle.path(), "killing plugin");
            handle.client().kill();
        }
    }

    fn require(&self, path: &str) -> Result<Arc<PluginHandle>, PluginError> {
        self.get_plugin(path).ok_or_else(|| PluginError::NotFound {
            name: path.to_owned(),
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, HostState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, HostState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: PluginLauncher> PluginHost<L> {
    /// Discovers and launches every plugin in the plugin directory.
    ///
    /// Plugins that fail to load are logged and skipped. Calling `init`
    /// again before [`PluginHost::kill`] does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] when the plugin directory exists
    /// but cannot be read.
    pub fn init(&self) -> Result<(), PluginError> {
        let mut state = self.write_state();
        if state.initialised {
            debug!(target: HOST_TARGET, "plugin host already initialised");
            return Ok(());
        }

        let candidates = discover_plugins(self.settings.plugin_dir())?;
        for candidate in candidates {
            let manifest = self.settings.manifest_for(candidate);
            let path = manifest.identity();
            match self.load(&manifest) {
                Ok(handle) => {
                    info!(
                        target: HOST_TARGET,
                        plugin = %path,
                        version = handle.info().version(),
                        "plugin loaded"
                    );
                    if let Err(err) = state.registry.register(handle) {
                        error!(target: HOST_TARGET, plugin = %path, error = %err, "failed to register plugin");
                    }
                }
                Err(err) => error!(
                    target: HOST_TARGET,
                    plugin = %path,
                    error = %err,
                    "failed to load plugin"
                ),
            }
        }
        state.initialised = true;
        info!(
            target: HOST_TARGET,
            loaded = state.registry.len(),
            dir = %self.settings.plugin_dir().display(),
            "plugin host initialised"
        );
        Ok(())
    }

    fn load(&self, manifest: &PluginManifest) -> Result<PluginHandle, PluginError> {
        let client = self.launcher.launch(manifest, self.settings.handshake())?;
        match self.check_version(manifest, client.as_ref()) {
            Ok(info) => Ok(PluginHandle::new(manifest.identity(), info, client)),
            Err(err) => {
                client.kill();
                Err(err)
            }
        }
    }

    fn check_version(
        &self,
        manifest: &PluginManifest,
        client: &dyn PluginClient,
    ) -> Result<PluginInfo, PluginError> {
        let info = client.info()?;
        let compatible = info
            .semver()
            .is_ok_and(|version| self.settings.api_version().matches(&version));
        if compatible {
            Ok(info)
        } else {
            Err(PluginError::IncompatibleVersion {
                name: manifest.identity(),
                version: info.version().to_owned(),
                required: self.settings.api_version().to_string(),
            })
        }
    }
}

impl<L> Drop for PluginHost<L> {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests;
