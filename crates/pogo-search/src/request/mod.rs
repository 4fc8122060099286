//! Request decoding and dispatch for `Execute`.
//!
//! A request is decoded once into a [`SearchRequest`], its `type` is parsed
//! into a [`RequestKind`], and the matching handler is looked up in a static
//! table. Every outcome, including every failure, is rendered back into an
//! escaped string; nothing here panics or returns an error to the transport.

use std::str::FromStr;

use pogo_plugins::codec::{self, ErrorCode};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, error, info};

use crate::engine::IndexingEngine;
use crate::error::{NO_RESULTS_MESSAGE, SearchError};
use crate::index::IndexedProject;

/// Tracing target for request handling.
const REQUEST_TARGET: &str = "pogo_search::request";

/// Search types this plugin serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RequestKind {
    /// List every file in a project.
    Files,
}

/// Input to `Execute`.
///
/// Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "projectRoot", default)]
    project_root: String,
}

impl SearchRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(kind: impl Into<String>, project_root: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            project_root: project_root.into(),
        }
    }

    /// Creates a "files" request for `project_root`.
    #[must_use]
    pub fn files(project_root: impl Into<String>) -> Self {
        Self::new(RequestKind::Files.to_string(), project_root)
    }

    /// Requested search type as sent.
    #[must_use]
    pub const fn kind(&self) -> &str {
        self.kind.as_str()
    }

    /// Project the search applies to.
    #[must_use]
    pub const fn project_root(&self) -> &str {
        self.project_root.as_str()
    }
}

/// Output of `Execute` for a recognised request.
///
/// Exactly one of `index` and `error` is meaningful: a populated index with
/// an empty error, or an empty index with a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    index: IndexedProject,
    #[serde(default)]
    error: String,
}

impl SearchResponse {
    /// Successful response carrying `index`.
    #[must_use]
    pub fn found(index: IndexedProject) -> Self {
        Self {
            index,
            error: String::new(),
        }
    }

    /// Response for a project with nothing to report.
    #[must_use]
    pub fn no_results() -> Self {
        Self {
            index: IndexedProject::default(),
            error: NO_RESULTS_MESSAGE.to_owned(),
        }
    }

    /// The listing; empty when `error` is set.
    #[must_use]
    pub const fn index(&self) -> &IndexedProject {
        &self.index
    }

    /// Failure message; empty on success.
    #[must_use]
    pub const fn error(&self) -> &str {
        self.error.as_str()
    }
}

type Handler = fn(&IndexingEngine, &SearchRequest) -> Result<SearchResponse, SearchError>;

const HANDLERS: &[(RequestKind, Handler)] = &[(RequestKind::Files, handle_files as Handler)];

fn handle_files(
    engine: &IndexingEngine,
    request: &SearchRequest,
) -> Result<SearchResponse, SearchError> {
    let project = engine.get_files(request.project_root())?;
    Ok(SearchResponse::found(IndexedProject::clone(&project)))
}

/// Handles one escaped request and returns the escaped response.
#[must_use]
pub fn execute(engine: &IndexingEngine, encoded: &str) -> String {
    let outcome = codec::decode::<SearchRequest>(encoded)
        .map_err(SearchError::from)
        .and_then(|request| dispatch(engine, &request));
    match outcome {
        Ok(response) => render(&response),
        Err(err) => render_error(&err),
    }
}

fn dispatch(engine: &IndexingEngine, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
    let unknown = || SearchError::UnknownKind {
        kind: request.kind().to_owned(),
    };
    let kind = RequestKind::from_str(request.kind()).map_err(|_| unknown())?;
    let handler = HANDLERS
        .iter()
        .find_map(|(candidate, handler)| (*candidate == kind).then_some(*handler))
        .ok_or_else(unknown)?;
    debug!(
        target: REQUEST_TARGET,
        kind = %kind,
        project = request.project_root(),
        "dispatching request"
    );
    handler(engine, request)
}

fn render(response: &SearchResponse) -> String {
    codec::encode(response).unwrap_or_else(|err| {
        error!(target: REQUEST_TARGET, error = %err, "failed to write search response");
        let fallback = SearchError::from(err);
        codec::encode_error(fallback.error_code(), fallback.public_message())
    })
}

fn render_error(err: &SearchError) -> String {
    match err {
        SearchError::NotFound { .. } | SearchError::Pending { .. } => {
            info!(target: REQUEST_TARGET, error = %err, "no results");
            render(&SearchResponse::no_results())
        }
        _ => {
            let code = err.error_code();
            if code == ErrorCode::Internal {
                error!(target: REQUEST_TARGET, error = %err, code = code.as_u16(), "request failed");
            } else {
                info!(target: REQUEST_TARGET, error = %err, code = code.as_u16(), "request rejected");
            }
            codec::encode_error(code, err.public_message())
        }
    }
}

#[cfg(test)]
mod tests;
