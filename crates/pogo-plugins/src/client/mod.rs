//! Host-side seams for talking to a launched plugin.
//!
//! [`PluginLauncher`] turns a [`PluginManifest`] into a live
//! [`PluginClient`]. The production pair is
//! [`ProcessLauncher`](crate::process::ProcessLauncher) and
//! [`PluginProcess`](crate::process::PluginProcess); tests substitute doubles
//! so the host can be exercised without spawning processes.

use crate::capability::{PluginInfo, ProcessProjectRequest};
use crate::error::PluginError;
use crate::handshake::HandshakeConfig;
use crate::manifest::PluginManifest;

/// A connection to one running plugin.
pub trait PluginClient: Send + Sync {
    /// Calls the plugin's `info` capability.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the call fails or times out.
    fn info(&self) -> Result<PluginInfo, PluginError>;

    /// Calls the plugin's `execute` capability with an escaped request.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the call fails or times out.
    fn execute(&self, request: &str) -> Result<String, PluginError>;

    /// Calls the plugin's `process_project` capability.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the plugin rejects the request or the
    /// call fails.
    fn process_project(&self, request: &ProcessProjectRequest) -> Result<(), PluginError>;

    /// Terminates the plugin. Calling it more than once is harmless.
    fn kill(&self);
}

/// Starts plugins and completes their handshake.
///
/// # Example
///
/// ```
/// use pogo_plugins::client::{PluginClient, PluginLauncher};
/// use pogo_plugins::handshake::HandshakeConfig;
/// use pogo_plugins::{PluginError, PluginManifest};
///
/// struct RefusingLauncher;
///
/// impl PluginLauncher for RefusingLauncher {
///     fn launch(
///         &self,
///         manifest: &PluginManifest,
///         _handshake: &HandshakeConfig,
///     ) -> Result<Box<dyn PluginClient>, PluginError> {
///         Err(PluginError::SpawnFailed {
///             name: manifest.identity(),
///             message: String::from("disabled"),
///             source: None,
///         })
///     }
/// }
/// ```
pub trait PluginLauncher: Send + Sync {
    /// Launches the plugin described by `manifest`.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the process cannot be started or fails
    /// the handshake.
    fn launch(
        &self,
        manifest: &PluginManifest,
        handshake: &HandshakeConfig,
    ) -> Result<Box<dyn PluginClient>, PluginError>;
}
