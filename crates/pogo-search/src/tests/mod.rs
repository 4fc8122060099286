//! Crate-level tests for the search plugin.

use pogo_plugins::{Plugin, ProcessProjectRequest, codec};

use crate::engine::{DEFAULT_BUILD_WORKERS, IndexingEngine};
use crate::{API_VERSION, BasicSearch, SearchRequest, SearchResponse};


fn plugin() -> BasicSearch {
    BasicSearch::with_engine(IndexingEngine::without_watcher(DEFAULT_BUILD_WORKERS))
}

#[test]
fn info_reports_api_version() {
    assert_eq!(plugin().info().version(), API_VERSION);
}

#[test]
fn relative_project_is_rejected_through_capability() {
    let error = plugin()
        .process_project(&ProcessProjectRequest::new("relative"))
        .expect_err("rejected");
    assert!(error.to_string().contains("absolute"));
}

#[test]
fn execute_never_fails_on_garbage() {
    let reply = plugin().execute("%%%");
    let response: SearchResponse = codec::decode(&reply).expect("well-formed reply");
    assert!(response.index().paths().is_empty());
    assert!(!response.error().is_empty());
}

#[test]
fn pending_project_reports_no_results() {
    let search = plugin();
    let request = codec::encode(&SearchRequest::files("/does/not/exist/yet")).expect("encode");
    search
        .process_project(&ProcessProjectRequest::new("/does/not/exist/yet"))
        .expect("accepted");
    let response: SearchResponse = codec::decode(&search.execute(&request)).expect("decode");
    assert_eq!(response, SearchResponse::no_results());
}
