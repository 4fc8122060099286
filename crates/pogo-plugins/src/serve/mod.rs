//! Plugin-side serving loop.
//!
//! A plugin binary calls [`serve`] from `main`. The loop refuses to run unless
//! the host's cookie is present, announces the handshake on stdout, and then
//! answers one [`RpcRequest`] per input line until stdin closes. Plugins must
//! keep stdout free of anything else; logging belongs on stderr.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::capability::Plugin;
use crate::handshake::{HandshakeConfig, HandshakeError};
use crate::protocol::{RpcCall, RpcOutcome, RpcRequest, RpcResponse};

/// Tracing target for the serving loop.
const SERVE_TARGET: &str = "pogo_plugins::serve";

/// Errors that stop the serving loop.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The process was not launched by a host.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// Reading the next request failed.
    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),

    /// Writing a response failed.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),

    /// A response could not be serialised.
    #[error("failed to serialise response: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Serves `plugin` over the process's stdin and stdout.
///
/// # Errors
///
/// Returns [`ServeError::Handshake`] when the host cookie is missing, or an
/// I/O error when the channel breaks. Returns `Ok(())` once the host closes
/// stdin.
pub fn serve<P: Plugin + ?Sized>(plugin: &P, handshake: &HandshakeConfig) -> Result<(), ServeError> {
    handshake.check_environment()?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_with(plugin, handshake, &mut stdin.lock(), &mut stdout.lock())
}

/// Serves `plugin` over arbitrary streams without checking the environment.
///
/// # Errors
///
/// Returns an error when reading, writing or serialising fails.
pub fn serve_with<P, R, W>(
    plugin: &P,
    handshake: &HandshakeConfig,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), ServeError>
where
    P: Plugin + ?Sized,
    R: BufRead,
    W: Write,
{
    write_line(writer, handshake)?;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(ServeError::Read)?;
        if read == 0 {
            debug!(target: SERVE_TARGET, "host closed the channel");
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let response = answer(plugin, trimmed);
        write_line(writer, &response)?;
    }
}

fn answer<P: Plugin + ?Sized>(plugin: &P, line: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) => {
            let id = request.id();
            debug!(target: SERVE_TARGET, id, method = request.call().method(), "handling call");
            RpcResponse::new(id, dispatch(plugin, request.into_call()))
        }
        Err(error) => {
            warn!(target: SERVE_TARGET, %error, "malformed request line");
            RpcResponse::new(
                recover_id(line),
                RpcOutcome::Failed {
                    message: format!("malformed request: {error}"),
                },
            )
        }
    }
}

fn dispatch<P: Plugin + ?Sized>(plugin: &P, call: RpcCall) -> RpcOutcome {
    match call {
        RpcCall::Info => plugin.info().into(),
        RpcCall::Execute { request } => RpcOutcome::Executed {
            response: plugin.execute(&request),
        },
        RpcCall::ProcessProject(request) => match plugin.process_project(&request) {
            Ok(()) => RpcOutcome::Accepted,
            Err(error) => RpcOutcome::Failed {
                message: error.to_string(),
            },
        },
    }
}

/// Best-effort id extraction so the host can still correlate the failure.
fn recover_id(line: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|value| value.get("id").and_then(serde_json::Value::as_u64))
        .unwrap_or(0)
}

fn write_line<W: Write, T: serde::Serialize>(writer: &mut W, value: &T) -> Result<(), ServeError> {
    let json = serde_json::to_string(value).map_err(ServeError::Serialize)?;
    writer
        .write_all(json.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .and_then(|()| writer.flush())
        .map_err(ServeError::Write)
}
