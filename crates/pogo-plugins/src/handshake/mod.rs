//! Versioned handshake between the host and a freshly spawned plugin.
//!
//! The host exports the magic cookie as an environment variable when it spawns
//! a plugin. A plugin that finds the cookie answers with a single JSON line
//! describing the protocol version and cookie it speaks; the host compares that
//! line with its own [`HandshakeConfig`] before treating the process as a
//! plugin. This keeps users from wiring arbitrary executables into the plugin
//! directory. It is a usability guard only: a process that deliberately echoes
//! the right values is indistinguishable from a real plugin, and nothing here
//! sandboxes it.

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable carrying the host's protocol version to the plugin.
pub const PROTOCOL_VERSION_ENV: &str = "POGO_PLUGIN_PROTOCOL_VERSION";

/// Protocol version spoken by search plugins.
pub const SEARCH_PROTOCOL_VERSION: u32 = 2;

/// Cookie key shared by the host and search plugins.
pub const SEARCH_COOKIE_KEY: &str = "SEARCH_PLUGIN";

/// Cookie value shared by the host and search plugins.
pub const SEARCH_COOKIE_VALUE: &str = "93f6bc9f97c03ed00fa85c904aca15a92752e549";

/// The values both sides must agree on before any call is made.
///
/// Serialises to the handshake line a plugin writes on stdout.
///
/// # Example
///
/// ```
/// use pogo_plugins::handshake::HandshakeConfig;
///
/// let expected = HandshakeConfig::search();
/// let offered = HandshakeConfig::new(2, "SEARCH_PLUGIN", "wrong");
/// assert!(expected.verify(&offered).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeConfig {
    protocol_version: u32,
    magic_cookie_key: String,
    magic_cookie_value: String,
}

impl HandshakeConfig {
    /// Creates a handshake description.
    #[must_use]
    pub fn new(
        protocol_version: u32,
        magic_cookie_key: impl Into<String>,
        magic_cookie_value: impl Into<String>,
    ) -> Self {
        Self {
            protocol_version,
            magic_cookie_key: magic_cookie_key.into(),
            magic_cookie_value: magic_cookie_value.into(),
        }
    }

    /// Handshake spoken by search plugins such as `pogo-search`.
    #[must_use]
    pub fn search() -> Self {
        Self::new(
            SEARCH_PROTOCOL_VERSION,
            SEARCH_COOKIE_KEY,
            SEARCH_COOKIE_VALUE,
        )
    }

    /// Protocol version.
    #[must_use]
    pub const fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Name of the cookie environment variable.
    #[must_use]
    pub const fn magic_cookie_key(&self) -> &str {
        self.magic_cookie_key.as_str()
    }

    /// Expected cookie value.
    #[must_use]
    pub const fn magic_cookie_value(&self) -> &str {
        self.magic_cookie_value.as_str()
    }

    /// Host side: checks the handshake offered by a plugin.
    ///
    /// # Errors
    ///
    /// Returns the first mismatching field as a [`HandshakeError`].
    pub fn verify(&self, offered: &Self) -> Result<(), HandshakeError> {
        if offered.protocol_version != self.protocol_version {
            return Err(HandshakeError::ProtocolVersion {
                expected: self.protocol_version,
                offered: offered.protocol_version,
            });
        }
        if offered.magic_cookie_key != self.magic_cookie_key {
            return Err(HandshakeError::CookieKey {
                expected: self.magic_cookie_key.clone(),
                offered: offered.magic_cookie_key.clone(),
            });
        }
        if offered.magic_cookie_value != self.magic_cookie_value {
            return Err(HandshakeError::CookieValue {
                key: self.magic_cookie_key.clone(),
            });
        }
        Ok(())
    }

    /// Plugin side: checks that the process was launched by a host.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::MissingCookie`] when the cookie variable is
    /// absent or holds a different value.
    pub fn check_environment(&self) -> Result<(), HandshakeError> {
        self.check_cookie(env::var(&self.magic_cookie_key).ok().as_deref())
    }

    fn check_cookie(&self, value: Option<&str>) -> Result<(), HandshakeError> {
        match value {
            Some(found) if found == self.magic_cookie_value => Ok(()),
            _ => Err(HandshakeError::MissingCookie {
                key: self.magic_cookie_key.clone(),
            }),
        }
    }
}

/// Reasons a handshake is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The plugin speaks a different protocol version.
    #[error("unsupported protocol version {offered} (expected {expected})")]
    ProtocolVersion {
        /// Version the host speaks.
        expected: u32,
        /// Version the plugin offered.
        offered: u32,
    },
    /// The plugin answered with a different cookie key.
    #[error("unexpected magic cookie key '{offered}' (expected '{expected}')")]
    CookieKey {
        /// Key the host expects.
        expected: String,
        /// Key the plugin offered.
        offered: String,
    },
    /// The plugin answered with the wrong cookie value.
    #[error("magic cookie value for '{key}' does not match")]
    CookieValue {
        /// Cookie key involved.
        key: String,
    },
    /// The handshake line was not valid JSON.
    #[error("malformed handshake line: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
    /// The plugin closed stdout before handshaking.
    #[error("plugin exited before completing the handshake")]
    Closed,
    /// The plugin did not handshake in time.
    #[error("no handshake within {timeout_secs}s")]
    TimedOut {
        /// Budget that elapsed.
        timeout_secs: u64,
    },
    /// The plugin binary was run without the host's cookie.
    #[error(
        "this binary is a plugin and is not meant to be executed directly; \
         run the pogo daemon, which loads it (missing or invalid '{key}')"
    )]
    MissingCookie {
        /// Cookie variable that was checked.
        key: String,
    },
}

#[cfg(test)]
mod tests;
