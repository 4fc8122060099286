//! String codec for payloads crossing the plugin boundary.
//!
//! The RPC channel only carries strings, so structured payloads are written as
//! JSON and then form-URL-escaped. Decoding reverses both steps and keeps the
//! two failure modes apart: a malformed escape is a [`CodecError::Transport`],
//! while well-escaped text that is not the expected JSON is a
//! [`CodecError::Schema`]. The host never calls into this module for plugin
//! payloads; it exists so plugins (and their callers) agree on one convention.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

/// Escaped form of `{"errorCode":500,"error":"Internal error."}`, used when
/// even an error response cannot be serialised.
const FALLBACK_INTERNAL_ERROR: &str =
    "%7B%22errorCode%22%3A500%2C%22error%22%3A%22Internal+error.%22%7D";

/// Numeric codes attached to error payloads.
///
/// # Example
///
/// ```
/// use pogo_plugins::codec::ErrorCode;
///
/// assert_eq!(ErrorCode::NotFound.as_u16(), 404);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The request could not be understood.
    BadRequest,
    /// The request named something that does not exist.
    NotFound,
    /// The plugin failed while serving the request.
    Internal,
}

impl ErrorCode {
    /// Returns the numeric value written to the wire.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Failures raised while encoding or decoding a payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The string is not valid form-URL-escaped UTF-8.
    #[error("could not unescape payload: {message}")]
    Transport {
        /// Description of the malformed input.
        message: String,
    },
    /// The unescaped text is not the JSON shape the caller expected.
    #[error("payload does not match the expected schema: {source}")]
    Schema {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A value could not be serialised on the way out.
    #[error("failed to serialise payload: {source}")]
    Serialize {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Code reported to the caller for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Schema { .. } => ErrorCode::BadRequest,
            Self::Transport { .. } | Self::Serialize { .. } => ErrorCode::Internal,
        }
    }
}

/// Error payload used when a plugin cannot form its regular response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "errorCode")]
    error_code: u16,
    error: String,
}

impl ErrorResponse {
    /// Creates an error payload.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: code.as_u16(),
            error: message.into(),
        }
    }

    /// Numeric error code.
    #[must_use]
    pub const fn error_code(&self) -> u16 {
        self.error_code
    }

    /// Human-readable message.
    #[must_use]
    pub const fn error(&self) -> &str {
        self.error.as_str()
    }
}

/// Form-URL-escapes `raw` (spaces become `+`).
///
/// # Example
///
/// ```
/// use pogo_plugins::codec::escape;
///
/// assert_eq!(escape("{\"a\": 1}"), "%7B%22a%22%3A+1%7D");
/// ```
#[must_use]
pub fn escape(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Reverses [`escape`], rejecting malformed percent sequences.
///
/// # Errors
///
/// Returns [`CodecError::Transport`] when a `%` is not followed by two hex
/// digits or the decoded bytes are not UTF-8.
pub fn unescape(encoded: &str) -> Result<String, CodecError> {
    validate_escapes(encoded)?;
    let spaced = encoded.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|error| CodecError::Transport {
            message: format!("decoded bytes are not UTF-8: {error}"),
        })
}

fn validate_escapes(encoded: &str) -> Result<(), CodecError> {
    let mut bytes = encoded.bytes().enumerate();
    while let Some((position, byte)) = bytes.next() {
        if byte != b'%' {
            continue;
        }
        let high = bytes.next().map(|(_, digit)| digit);
        let low = bytes.next().map(|(_, digit)| digit);
        match (high, low) {
            (Some(first), Some(second))
                if first.is_ascii_hexdigit() && second.is_ascii_hexdigit() => {}
            _ => {
                return Err(CodecError::Transport {
                    message: format!("invalid percent escape at byte {position}"),
                });
            }
        }
    }
    Ok(())
}

/// Serialises `value` to JSON and escapes it for the wire.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if `value` cannot be written as JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_string(value).map_err(|source| CodecError::Serialize { source })?;
    Ok(escape(&json))
}

/// Unescapes `encoded` and parses it as `T`.
///
/// # Errors
///
/// Returns [`CodecError::Transport`] for malformed escaping and
/// [`CodecError::Schema`] for JSON that does not fit `T`.
pub fn decode<T: DeserializeOwned>(encoded: &str) -> Result<T, CodecError> {
    let json = unescape(encoded)?;
    serde_json::from_str(&json).map_err(|source| CodecError::Schema { source })
}

/// Encodes an [`ErrorResponse`]; never fails.
#[must_use]
pub fn encode_error(code: ErrorCode, message: &str) -> String {
    encode(&ErrorResponse::new(code, message))
        .unwrap_or_else(|_| FALLBACK_INTERNAL_ERROR.to_owned())
}
