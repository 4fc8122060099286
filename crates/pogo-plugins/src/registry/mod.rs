//! Registry of loaded plugins keyed by executable path.
//!
//! The [`PluginRegistry`] owns a [`PluginHandle`] for every plugin that
//! survived launch and version checks. Keys are kept ordered so path listings
//! are deterministic. Duplicate registrations are rejected.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::capability::PluginInfo;
use crate::client::PluginClient;
use crate::error::PluginError;

/// A loaded plugin and the info it reported at load time.
pub struct PluginHandle {
    path: String,
    info: PluginInfo,
    client: Box<dyn PluginClient>,
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("path", &self.path)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl PluginHandle {
    /// Wraps a launched client.
    #[must_use]
    pub fn new(path: impl Into<String>, info: PluginInfo, client: Box<dyn PluginClient>) -> Self {
        Self {
            path: path.into(),
            info,
            client,
        }
    }

    /// Executable path the plugin was loaded from.
    #[must_use]
    pub const fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Info reported during loading.
    #[must_use]
    pub const fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Live connection to the plugin.
    #[must_use]
    pub fn client(&self) -> &dyn PluginClient {
        self.client.as_ref()
    }
}

/// Loaded plugins keyed by executable path.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<PluginHandle>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loaded plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if a plugin with the same path is
    /// already registered. The rejected handle is dropped.
    pub fn register(&mut self, handle: PluginHandle) -> Result<(), PluginError> {
        let path = handle.path().to_owned();
        if self.plugins.contains_key(&path) {
            handle.client().kill();
            return Err(PluginError::Manifest {
                message: format!("plugin '{path}' is already registered"),
            });
        }
        self.plugins.insert(path, Arc::new(handle));
        Ok(())
    }

    /// Looks up a plugin by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<PluginHandle>> {
        self.plugins.get(path).cloned()
    }

    /// Registered paths in ascending order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    /// All loaded plugins in path order.
    #[must_use]
    pub fn handles(&self) -> Vec<Arc<PluginHandle>> {
        self.plugins.values().cloned().collect()
    }

    /// Removes and returns every plugin.
    pub fn drain(&mut self) -> Vec<Arc<PluginHandle>> {
        std::mem::take(&mut self.plugins).into_values().collect()
    }

    /// Number of loaded plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
