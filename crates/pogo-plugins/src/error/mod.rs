//! Domain errors raised by host-side plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint and keep the enum cloneable
//! where it is stored.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::ErrorCode;
use crate::handshake::HandshakeError;

/// Errors arising from plugin discovery, launch and calls.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No loaded plugin is registered under the path.
    #[error("plugin '{name}' is not loaded")]
    NotFound {
        /// Path that was looked up.
        name: String,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin path.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin failed the handshake.
    #[error("plugin '{name}' failed the handshake: {source}")]
    Handshake {
        /// Plugin path.
        name: String,
        /// Reason the handshake was rejected.
        #[source]
        source: HandshakeError,
    },

    /// The plugin implements an API revision the host does not accept.
    #[error("plugin '{name}' reports version '{version}', host requires '{required}'")]
    IncompatibleVersion {
        /// Plugin path.
        name: String,
        /// Version reported by the plugin.
        version: String,
        /// Requirement configured on the host.
        required: String,
    },

    /// The plugin did not answer within the configured timeout.
    #[error("plugin '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Plugin path.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The plugin closed its channel.
    #[error("plugin '{name}' is no longer running")]
    Disconnected {
        /// Plugin path.
        name: String,
    },

    /// The plugin reported a failed call.
    #[error("plugin '{name}' reported an error: {message}")]
    Remote {
        /// Plugin path.
        name: String,
        /// Message sent by the plugin.
        message: String,
    },

    /// The plugin answered with a reply that does not fit the call.
    #[error("plugin '{name}' sent an unexpected reply: {message}")]
    UnexpectedReply {
        /// Plugin path.
        name: String,
        /// Description of the protocol violation.
        message: String,
    },

    /// A request could not be serialised.
    #[error("failed to serialise plugin request: {0}")]
    SerializeRequest(#[source] serde_json::Error),

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin path.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A plugin manifest failed validation.
    #[error("manifest error: {message}")]
    Manifest {
        /// Description of the validation failure.
        message: String,
    },

    /// The plugin directory could not be scanned.
    #[error("failed to scan plugin directory {}: {source}", path.display())]
    Discovery {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl PluginError {
    /// Status code used when the failure is surfaced to an API caller.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            _ => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests;
