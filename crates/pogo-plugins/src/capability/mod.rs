//! The capability contract every plugin implements.
//!
//! A plugin exposes exactly three operations: [`Plugin::info`] declares the
//! API revision it implements, [`Plugin::execute`] is the single opaque
//! request/response entry point, and [`Plugin::process_project`] asks the
//! plugin to start tracking a project root. Request and response strings are
//! plugin-specific; by convention they are escaped JSON (see
//! [`crate::codec`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies the API revision a plugin implements.
///
/// # Example
///
/// ```
/// use pogo_plugins::PluginInfo;
///
/// let info = PluginInfo::new("0.0.1");
/// assert_eq!(info.version(), "0.0.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    version: String,
}

impl PluginInfo {
    /// Creates plugin info for `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// Declared version string.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Parses the declared version as semver.
    ///
    /// # Errors
    ///
    /// Returns the semver parser error for malformed versions.
    pub fn semver(&self) -> Result<semver::Version, semver::Error> {
        semver::Version::parse(&self.version)
    }
}

/// Request to begin tracking a project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessProjectRequest {
    path: String,
}

impl ProcessProjectRequest {
    /// Creates a request for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Project root to track.
    #[must_use]
    pub const fn path(&self) -> &str {
        self.path.as_str()
    }
}

/// Validation failures reported by [`Plugin::process_project`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The request was rejected before any work was scheduled.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Why the request was rejected.
        message: String,
    },
}

/// Operations a plugin process serves.
///
/// Implementations must be shareable across threads: the serving loop may be
/// driven from one thread while background work (such as index builds) runs on
/// others.
pub trait Plugin: Send + Sync {
    /// Returns the plugin's API version. Must not have side effects.
    fn info(&self) -> PluginInfo;

    /// Handles one opaque request.
    ///
    /// Every failure must be reported inside the returned string; this method
    /// never panics on bad input.
    fn execute(&self, request: &str) -> String;

    /// Registers a project root for ongoing tracking and returns at once.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidRequest`] when the request itself is
    /// unusable. Failures of the work scheduled afterwards are not reported
    /// here.
    fn process_project(&self, request: &ProcessProjectRequest) -> Result<(), CapabilityError>;
}
