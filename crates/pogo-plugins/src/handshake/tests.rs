//! Unit tests for handshake verification.

use rstest::rstest;

use super::*;

#[test]
fn matching_handshake_is_accepted() {
    let expected = HandshakeConfig::search();
    assert_eq!(expected.verify(&HandshakeConfig::search()), Ok(()));
}

#[rstest]
#[case::protocol(
    HandshakeConfig::new(1, SEARCH_COOKIE_KEY, SEARCH_COOKIE_VALUE),
    "protocol version"
)]
#[case::cookie_key(
    HandshakeConfig::new(SEARCH_PROTOCOL_VERSION, "OTHER_PLUGIN", SEARCH_COOKIE_VALUE),
    "cookie key"
)]
#[case::cookie_value(
    HandshakeConfig::new(SEARCH_PROTOCOL_VERSION, SEARCH_COOKIE_KEY, "nope"),
    "cookie value"
)]
fn mismatches_are_rejected(#[case] offered: HandshakeConfig, #[case] fragment: &str) {
    let error = HandshakeConfig::search()
        .verify(&offered)
        .expect_err("mismatch should be rejected");
    assert!(
        error.to_string().contains(fragment),
        "expected '{fragment}' in: {error}"
    );
}

#[test]
fn cookie_value_is_not_echoed_in_errors() {
    let offered = HandshakeConfig::new(SEARCH_PROTOCOL_VERSION, SEARCH_COOKIE_KEY, "guess");
    let error = HandshakeConfig::search()
        .verify(&offered)
        .expect_err("mismatch should be rejected");
    assert!(!error.to_string().contains(SEARCH_COOKIE_VALUE));
}

#[test]
fn handshake_line_uses_camel_case_keys() {
    let line = serde_json::to_string(&HandshakeConfig::search()).expect("serialise");
    assert_eq!(
        line,
        format!(
            "{{\"protocolVersion\":2,\"magicCookieKey\":\"SEARCH_PLUGIN\",\"magicCookieValue\":\"{SEARCH_COOKIE_VALUE}\"}}"
        )
    );
}

#[rstest]
#[case::absent(None)]
#[case::wrong(Some("not-the-cookie"))]
fn plugin_refuses_to_run_without_cookie(#[case] value: Option<&str>) {
    let error = HandshakeConfig::search()
        .check_cookie(value)
        .expect_err("should refuse");
    assert!(matches!(error, HandshakeError::MissingCookie { .. }));
    assert!(error.to_string().contains("not meant to be executed directly"));
}

#[test]
fn plugin_accepts_host_cookie() {
    let config = HandshakeConfig::search();
    assert_eq!(config.check_cookie(Some(SEARCH_COOKIE_VALUE)), Ok(()));
}
