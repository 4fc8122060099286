//! Unit tests for the RPC frames.

use rstest::rstest;

use super::*;

#[rstest]
#[case::info(RpcCall::Info, r#"{"id":1,"call":{"method":"info"}}"#)]
#[case::execute(
    RpcCall::Execute { request: String::from("%7B%7D") },
    r#"{"id":1,"call":{"method":"execute","params":{"request":"%7B%7D"}}}"#
)]
#[case::process_project(
    RpcCall::ProcessProject(ProcessProjectRequest::new("/tmp/proj")),
    r#"{"id":1,"call":{"method":"process_project","params":{"path":"/tmp/proj"}}}"#
)]
fn requests_have_stable_wire_form(#[case] call: RpcCall, #[case] expected: &str) {
    let line = serde_json::to_string(&RpcRequest::new(1, call.clone())).expect("serialise");
    assert_eq!(line, expected);
    let back: RpcRequest = serde_json::from_str(&line).expect("deserialise");
    assert_eq!(back.call(), &call);
}

#[rstest]
#[case::info(RpcOutcome::Info { version: String::from("0.0.1") }, "info")]
#[case::executed(RpcOutcome::Executed { response: String::from("x") }, "executed")]
#[case::accepted(RpcOutcome::Accepted, "accepted")]
#[case::failed(RpcOutcome::Failed { message: String::from("boom") }, "failed")]
fn outcomes_are_tagged_by_status(#[case] outcome: RpcOutcome, #[case] status: &str) {
    let value = serde_json::to_value(RpcResponse::new(3, outcome)).expect("serialise");
    assert_eq!(value["id"], 3);
    assert_eq!(value["outcome"]["status"], status);
}

#[test]
fn unknown_method_is_rejected() {
    let parsed = serde_json::from_str::<RpcRequest>(r#"{"id":1,"call":{"method":"reboot"}}"#);
    assert!(parsed.is_err());
}

#[test]
fn method_names_match_wire_tags() {
    assert_eq!(RpcCall::Info.method(), "info");
    assert_eq!(
        RpcCall::ProcessProject(ProcessProjectRequest::new("/p")).method(),
        "process_project"
    );
}
