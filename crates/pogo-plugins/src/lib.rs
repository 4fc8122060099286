//! Plugin host and wire contract for pogo.
//!
//! The `pogo-plugins` crate holds both halves of the plugin boundary. Plugins
//! are long-lived child processes that talk to the host over newline-delimited
//! JSON on their standard streams, after a versioned handshake that keeps
//! arbitrary executables from being treated as plugins.
//!
//! # Architecture
//!
//! - [`codec`] turns structured payloads into the transport-safe strings that
//!   cross the boundary and back.
//! - [`capability`] defines the [`Plugin`] trait every plugin implements.
//! - [`handshake`] and [`protocol`] describe the wire exchange.
//! - [`serve`] runs the plugin side of the channel.
//! - [`host`] discovers, launches and owns plugins via the [`client`] seams,
//!   with [`process`] providing the real child-process implementation.
//!
//! The handshake is a usability guard rather than a security boundary.
//! Plugins run with the host's privileges and are not sandboxed.
//!
//! # Example
//!
//! ```rust,no_run
//! use pogo_plugins::host::{HostSettings, PluginHost};
//! use pogo_plugins::process::ProcessLauncher;
//! use pogo_plugins::codec;
//! use semver::VersionReq;
//!
//! let api = VersionReq::parse(">=0.0.1, <0.1.0").expect("valid range");
//! let host = PluginHost::new(HostSettings::new("/opt/pogo/plugins", api), ProcessLauncher);
//! host.init().expect("plugin directory readable");
//! host.process_project("/tmp/proj");
//! let request = codec::escape(r#"{"type":"files","projectRoot":"/tmp/proj"}"#);
//! let response = host.execute("/opt/pogo/plugins/pogo-search", &request);
//! ```

pub mod capability;
pub mod client;
pub mod codec;
pub mod error;
pub mod handshake;
pub mod host;
pub mod manifest;
pub mod process;
pub mod protocol;
pub mod registry;
pub mod serve;

#[cfg(test)]
mod tests;

pub use self::capability::{CapabilityError, Plugin, PluginInfo, ProcessProjectRequest};
pub use self::error::PluginError;
pub use self::handshake::{HandshakeConfig, HandshakeError};
pub use self::host::{HostSettings, PluginHost};
pub use self::manifest::PluginManifest;
pub use self::registry::{PluginHandle, PluginRegistry};
pub use self::serve::{ServeError, serve};
