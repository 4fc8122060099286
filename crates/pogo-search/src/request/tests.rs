//! Unit tests for request decoding and dispatch.

use std::fs;
use std::time::Duration;

use pogo_plugins::codec::ErrorResponse;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::engine::DEFAULT_BUILD_WORKERS;

#[fixture]
fn engine() -> IndexingEngine {
    IndexingEngine::without_watcher(DEFAULT_BUILD_WORKERS)
}

fn response_of(encoded: &str) -> SearchResponse {
    codec::decode(encoded).expect("search response")
}

fn error_of(encoded: &str) -> ErrorResponse {
    codec::decode(encoded).expect("error response")
}

#[test]
fn request_round_trips_through_codec() {
    let request = SearchRequest::files("/tmp/proj");
    let encoded = codec::encode(&request).expect("encode");
    assert_eq!(codec::decode::<SearchRequest>(&encoded).expect("decode"), request);
}

#[test]
fn wire_names_match_protocol() {
    let json = serde_json::to_value(SearchRequest::files("/p")).expect("serialise");
    assert_eq!(json, serde_json::json!({"type": "files", "projectRoot": "/p"}));

    let response = serde_json::to_value(SearchResponse::no_results()).expect("serialise");
    assert_eq!(
        response,
        serde_json::json!({
            "index": {"root": "", "paths": []},
            "error": NO_RESULTS_MESSAGE,
        })
    );
}

#[test]
fn missing_fields_default_to_empty() {
    let request: SearchRequest = serde_json::from_str("{}").expect("decode");
    assert_eq!(request, SearchRequest::default());
}

#[rstest]
fn unknown_type_yields_404_with_empty_index(engine: IndexingEngine) {
    let encoded = codec::encode(&SearchRequest::new("bogus", "/tmp/proj")).expect("encode");
    let reply = execute(&engine, &encoded);

    let error = error_of(&reply);
    assert_eq!(error.error_code(), 404);
    assert_eq!(error.error(), "Unknown request type.");

    let as_search = response_of(&reply);
    assert!(as_search.index().paths().is_empty());
    assert_eq!(as_search.error(), "Unknown request type.");
}

#[rstest]
#[case::bad_escape("%7B%ZZ", 500, "Could not query decode request.")]
#[case::bad_json("%7Bnope", 400, "Invalid request.")]
#[case::wrong_shape("%5B1%2C2%5D", 400, "Invalid request.")]
fn undecodable_requests_get_error_responses(
    engine: IndexingEngine,
    #[case] encoded: &str,
    #[case] code: u16,
    #[case] message: &str,
) {
    let error = error_of(&execute(&engine, encoded));
    assert_eq!(error.error_code(), code);
    assert_eq!(error.error(), message);
}

#[rstest]
fn untracked_project_reports_no_results(engine: IndexingEngine) {
    let encoded = codec::encode(&SearchRequest::files("/never/seen")).expect("encode");
    assert_eq!(response_of(&execute(&engine, &encoded)), SearchResponse::no_results());
}

#[rstest]
fn files_request_returns_snapshot(engine: IndexingEngine) {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("a.txt"), "a").expect("write");
    let root = dir.path().to_str().expect("utf-8").to_owned();
    engine.process_project(&root).expect("accepted");
    assert!(engine.wait_until_idle(Duration::from_secs(10)));

    let encoded = codec::encode(&SearchRequest::files(root.as_str())).expect("encode");
    let response = response_of(&execute(&engine, &encoded));

    assert_eq!(response.error(), "");
    assert_eq!(response.index().root(), root);
    assert_eq!(response.index().paths(), [format!("{root}/a.txt")]);
}

#[test]
fn kinds_parse_from_wire_names() {
    assert_eq!(RequestKind::from_str("files").ok(), Some(RequestKind::Files));
    assert!(RequestKind::from_str("Files").is_err());
}
