//! RPC framing for host-plugin communication.
//!
//! After the handshake, the host and a plugin exchange newline-delimited JSON
//! over the plugin's stdin and stdout. The host writes one [`RpcRequest`] per
//! line and waits for the [`RpcResponse`] carrying the same id; plugin stderr
//! is captured for logging but is not part of the protocol.

use serde::{Deserialize, Serialize};

use crate::capability::{PluginInfo, ProcessProjectRequest};

/// A call issued by the host.
///
/// # Example
///
/// ```
/// use pogo_plugins::protocol::{RpcCall, RpcRequest};
///
/// let request = RpcRequest::new(7, RpcCall::Info);
/// let line = serde_json::to_string(&request).unwrap();
/// assert_eq!(line, r#"{"id":7,"call":{"method":"info"}}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    id: u64,
    call: RpcCall,
}

impl RpcRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(id: u64, call: RpcCall) -> Self {
        Self { id, call }
    }

    /// Correlation id echoed by the response.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The requested capability.
    #[must_use]
    pub const fn call(&self) -> &RpcCall {
        &self.call
    }

    /// Consumes the request, returning the call.
    #[must_use]
    pub fn into_call(self) -> RpcCall {
        self.call
    }
}

/// Capability methods callable over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum RpcCall {
    /// `Info()`.
    Info,
    /// `Execute(request)`.
    Execute {
        /// Opaque, escaped request string.
        request: String,
    },
    /// `ProcessProject(req)`.
    ProcessProject(ProcessProjectRequest),
}

impl RpcCall {
    /// Method name, for logging.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Execute { .. } => "execute",
            Self::ProcessProject(_) => "process_project",
        }
    }
}

/// A plugin's answer to one [`RpcRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    id: u64,
    outcome: RpcOutcome,
}

impl RpcResponse {
    /// Creates a response.
    #[must_use]
    pub const fn new(id: u64, outcome: RpcOutcome) -> Self {
        Self { id, outcome }
    }

    /// Id of the request being answered.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Result of the call.
    #[must_use]
    pub const fn outcome(&self) -> &RpcOutcome {
        &self.outcome
    }

    /// Consumes the response, returning the outcome.
    #[must_use]
    pub fn into_outcome(self) -> RpcOutcome {
        self.outcome
    }
}

/// Result of a call, discriminated by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RpcOutcome {
    /// Answer to [`RpcCall::Info`].
    Info {
        /// Declared plugin API version.
        version: String,
    },
    /// Answer to [`RpcCall::Execute`].
    Executed {
        /// Opaque, escaped response string.
        response: String,
    },
    /// Answer to [`RpcCall::ProcessProject`].
    Accepted,
    /// The call failed inside the plugin.
    Failed {
        /// Human-readable reason.
        message: String,
    },
}

impl From<PluginInfo> for RpcOutcome {
    fn from(info: PluginInfo) -> Self {
        Self::Info {
            version: info.version().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests;
