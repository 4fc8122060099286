//! Errors raised by the search plugin.
//!
//! [`SearchError`] covers everything `Execute` and `ProcessProject` can fail
//! with and knows how each failure is reported to the caller.
//! [`IndexError`] covers a single index build; build failures are only ever
//! logged because builds run in the background.

use std::sync::Arc;

use camino::Utf8PathBuf;
use pogo_plugins::codec::{CodecError, ErrorCode};
use thiserror::Error;

/// Message returned when a project has no snapshot to report.
pub const NO_RESULTS_MESSAGE: &str = "No results. See logs for further details.";

/// Failures handling a search request or project registration.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request string could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The request named a search type this plugin does not serve.
    #[error("unknown request type '{kind}'")]
    UnknownKind {
        /// Type named by the request.
        kind: String,
    },

    /// The project root was never registered.
    #[error("project '{root}' is not tracked")]
    NotFound {
        /// Root that was looked up.
        root: String,
    },

    /// The project root is tracked but its first build has not finished.
    #[error("project '{root}' is still being indexed")]
    Pending {
        /// Root that was looked up.
        root: String,
    },

    /// A project root was rejected during registration.
    #[error("invalid project root '{root}': {reason}")]
    InvalidRoot {
        /// Root as supplied.
        root: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The engine could not accept more work.
    #[error("indexing engine is shutting down")]
    ShuttingDown,
}

impl SearchError {
    /// Status code reported to the caller.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Codec(error) => error.error_code(),
            Self::UnknownKind { .. } | Self::NotFound { .. } | Self::Pending { .. } => {
                ErrorCode::NotFound
            }
            Self::InvalidRoot { .. } => ErrorCode::BadRequest,
            Self::ShuttingDown => ErrorCode::Internal,
        }
    }

    /// Message reported to the caller; details stay in the log.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Codec(CodecError::Transport { .. }) => "Could not query decode request.",
            Self::Codec(CodecError::Schema { .. }) | Self::InvalidRoot { .. } => "Invalid request.",
            Self::Codec(CodecError::Serialize { .. }) => "Error writing search response",
            Self::UnknownKind { .. } => "Unknown request type.",
            Self::NotFound { .. } | Self::Pending { .. } => NO_RESULTS_MESSAGE,
            Self::ShuttingDown => "Error retrieving files.",
        }
    }
}

/// Failures of a single index build.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The root could not be inspected.
    #[error("cannot read project root {root}: {source}")]
    Root {
        /// Root being indexed.
        root: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The root exists but is not a directory.
    #[error("project root {root} is not a directory")]
    NotADirectory {
        /// Root being indexed.
        root: Utf8PathBuf,
    },
}
