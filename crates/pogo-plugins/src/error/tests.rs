//! Unit tests for plugin error formatting.

use std::io;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn not_found_maps_to_404() {
    let error = PluginError::NotFound {
        name: String::from("/plugins/search"),
    };
    assert_eq!(error.error_code(), ErrorCode::NotFound);
    assert_eq!(error.to_string(), "plugin '/plugins/search' is not loaded");
}

#[rstest]
#[case::timeout(PluginError::Timeout { name: String::from("p"), timeout_secs: 3 })]
#[case::disconnected(PluginError::Disconnected { name: String::from("p") })]
#[case::remote(PluginError::Remote { name: String::from("p"), message: String::from("boom") })]
fn runtime_failures_map_to_500(#[case] error: PluginError) {
    assert_eq!(error.error_code(), ErrorCode::Internal);
}

#[test]
fn handshake_error_is_exposed_as_source() {
    let error = PluginError::Handshake {
        name: String::from("p"),
        source: HandshakeError::Closed,
    };
    let source = std::error::Error::source(&error).expect("source present");
    assert_eq!(
        source.to_string(),
        "plugin exited before completing the handshake"
    );
}

#[test]
fn discovery_error_names_directory() {
    let error = PluginError::Discovery {
        path: PathBuf::from("/nowhere"),
        source: Arc::new(io::Error::from(io::ErrorKind::PermissionDenied)),
    };
    assert!(error.to_string().contains("/nowhere"));
}

#[test]
fn incompatible_version_mentions_both_sides() {
    let error = PluginError::IncompatibleVersion {
        name: String::from("p"),
        version: String::from("1.0.0"),
        required: String::from(">=0.0.1, <0.1.0"),
    };
    let text = error.to_string();
    assert!(text.contains("1.0.0"));
    assert!(text.contains("<0.1.0"));
}
