//! The "files" search plugin for pogo.
//!
//! `pogo-search` keeps an in-memory listing of every file in each project the
//! host asks it to track, and answers `files` searches from that listing.
//! Listings are built in the background and refreshed when the filesystem
//! watcher reports that files were created, removed or renamed.
//!
//! The crate is both a library, so the engine can be exercised in-process,
//! and the `pogo-search` plugin binary, which serves [`BasicSearch`] over the
//! plugin protocol from `pogo-plugins`.
//!
//! # Example
//!
//! ```no_run
//! use pogo_plugins::{Plugin, ProcessProjectRequest, codec};
//! use pogo_search::{BasicSearch, SearchRequest, SearchResponse};
//!
//! let search = BasicSearch::new();
//! search
//!     .process_project(&ProcessProjectRequest::new("/tmp/proj"))
//!     .expect("valid root");
//! let request = codec::encode(&SearchRequest::files("/tmp/proj")).expect("encodable");
//! let response: SearchResponse = codec::decode(&search.execute(&request)).expect("decodable");
//! println!("{:?}", response.index().paths());
//! ```

pub mod engine;
pub mod error;
pub mod index;
pub mod request;

#[cfg(test)]
mod tests;

use pogo_plugins::{CapabilityError, Plugin, PluginInfo, ProcessProjectRequest};

pub use self::engine::IndexingEngine;
pub use self::error::{IndexError, SearchError};
pub use self::index::{IndexedProject, ProjectState};
pub use self::request::{RequestKind, SearchRequest, SearchResponse};

/// API version implemented by this plugin.
pub const API_VERSION: &str = "0.0.1";

/// The search plugin: an [`IndexingEngine`] behind the [`Plugin`] contract.
#[derive(Debug)]
pub struct BasicSearch {
    engine: IndexingEngine,
}

impl Default for BasicSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicSearch {
    /// Creates the plugin with a watching engine sized from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(IndexingEngine::from_env())
    }

    /// Wraps an existing engine.
    #[must_use]
    pub const fn with_engine(engine: IndexingEngine) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &IndexingEngine {
        &self.engine
    }
}

impl Plugin for BasicSearch {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(API_VERSION)
    }

    fn execute(&self, request: &str) -> String {
        request::execute(&self.engine, request)
    }

    fn process_project(&self, request: &ProcessProjectRequest) -> Result<(), CapabilityError> {
        self.engine
            .process_project(request.path())
            .map_err(|err| CapabilityError::InvalidRequest {
                message: err.to_string(),
            })
    }
}
