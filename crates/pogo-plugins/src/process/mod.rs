//! Process-backed plugin clients.
//!
//! [`ProcessLauncher`] spawns a plugin executable with the host cookie in its
//! environment and piped standard streams, waits for the handshake line, and
//! hands back a [`PluginProcess`]. Calls are newline-delimited JSON frames;
//! a background thread forwards stdout lines over a channel so every read can
//! be bounded by a timeout. Stderr is drained into the host's log.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::capability::{PluginInfo, ProcessProjectRequest};
use crate::client::{PluginClient, PluginLauncher};
use crate::error::PluginError;
use crate::handshake::{HandshakeConfig, HandshakeError, PROTOCOL_VERSION_ENV};
use crate::manifest::PluginManifest;
use crate::protocol::{RpcCall, RpcOutcome, RpcRequest, RpcResponse};

/// Tracing target for plugin process operations.
const PROCESS_TARGET: &str = "pogo_plugins::process";

/// Launches plugins as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl PluginLauncher for ProcessLauncher {
    fn launch(
        &self,
        manifest: &PluginManifest,
        handshake: &HandshakeConfig,
    ) -> Result<Box<dyn PluginClient>, PluginError> {
        Ok(Box::new(PluginProcess::spawn(manifest, handshake)?))
    }
}

struct Connection {
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
}

/// A running plugin process.
///
/// Calls are serialised: one request is in flight per plugin at a time. The
/// process is killed when the value is dropped.
pub struct PluginProcess {
    name: String,
    call_timeout: Duration,
    next_id: AtomicU64,
    connection: Mutex<Connection>,
    child: Mutex<Option<Child>>,
}

impl std::fmt::Debug for PluginProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let running = self
            .child
            .lock()
            .map(|child| if child.is_some() { "running" } else { "killed" })
            .unwrap_or("poisoned");
        f.debug_struct("PluginProcess")
            .field("name", &self.name)
            .field("call_timeout", &self.call_timeout)
            .field("state", &running)
            .finish_non_exhaustive()
    }
}

impl PluginProcess {
    /// Spawns the plugin and completes the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SpawnFailed`] when the process cannot start, or
    /// [`PluginError::Handshake`] when it does not handshake correctly within
    /// the manifest's budget. The child is killed on failure.
    pub fn spawn(
        manifest: &PluginManifest,
        handshake: &HandshakeConfig,
    ) -> Result<Self, PluginError> {
        manifest.validate()?;
        let name = manifest.identity();

        debug!(
            target: PROCESS_TARGET,
            plugin = %name,
            "spawning plugin process"
        );

        let mut child = Command::new(manifest.executable())
            .args(manifest.args())
            .env(handshake.magic_cookie_key(), handshake.magic_cookie_value())
            .env(PROTOCOL_VERSION_ENV, handshake.protocol_version().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| PluginError::SpawnFailed {
                name: name.clone(),
                message: err.to_string(),
                source: Some(Arc::new(err)),
            })?;

        let pipes = take_pipes(&name, &mut child);
        let (stdin, stdout, stderr) = match pipes {
            Ok(pipes) => pipes,
            Err(error) => {
                terminate(&name, &mut child);
                return Err(error);
            }
        };

        spawn_stderr_drain(&name, stderr);
        let lines = spawn_stdout_reader(&name, stdout);

        if let Err(error) = await_handshake(&name, &lines, handshake, manifest.handshake_timeout())
        {
            terminate(&name, &mut child);
            return Err(error);
        }

        info!(target: PROCESS_TARGET, plugin = %name, "plugin handshake complete");

        Ok(Self {
            name,
            call_timeout: manifest.call_timeout(),
            next_id: AtomicU64::new(1),
            connection: Mutex::new(Connection { stdin, lines }),
            child: Mutex::new(Some(child)),
        })
    }

    /// Registry key of the plugin.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    fn call(&self, call: RpcCall) -> Result<RpcOutcome, PluginError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let method = call.method();
        let line = serde_json::to_string(&RpcRequest::new(id, call))
            .map_err(PluginError::SerializeRequest)?;

        let mut connection = self.connection.lock().map_err(|_| PluginError::Disconnected {
            name: self.name.clone(),
        })?;

        debug!(target: PROCESS_TARGET, plugin = %self.name, id, method, "sending call");
        write_frame(&mut connection.stdin, &line).map_err(|err| self.io_error(err))?;

        let deadline = Instant::now() + self.call_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = match connection.lines.recv_timeout(remaining) {
                Ok(Ok(frame)) => frame,
                Ok(Err(err)) => return Err(self.io_error(err)),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(target: PROCESS_TARGET, plugin = %self.name, id, method, "call timed out");
                    return Err(PluginError::Timeout {
                        name: self.name.clone(),
                        timeout_secs: self.call_timeout.as_secs(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PluginError::Disconnected {
                        name: self.name.clone(),
                    });
                }
            };
            let response: RpcResponse =
                serde_json::from_str(&frame).map_err(|err| PluginError::UnexpectedReply {
                    name: self.name.clone(),
                    message: format!("invalid response frame: {err}"),
                })?;
            if response.id() == id {
                return Ok(response.into_outcome());
            }
            // A reply to an earlier call that already timed out.
            debug!(
                target: PROCESS_TARGET,
                plugin = %self.name,
                stale_id = response.id(),
                "discarding stale response"
            );
        }
    }

    fn io_error(&self, err: io::Error) -> PluginError {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return PluginError::Disconnected {
                name: self.name.clone(),
            };
        }
        PluginError::Io {
            name: self.name.clone(),
            source: Arc::new(err),
        }
    }

    fn unexpected(&self, expected: &str, outcome: &RpcOutcome) -> PluginError {
        match outcome {
            RpcOutcome::Failed { message } => PluginError::Remote {
                name: self.name.clone(),
                message: message.clone(),
            },
            other => PluginError::UnexpectedReply {
                name: self.name.clone(),
                message: format!("expected {expected}, got {other:?}"),
            },
        }
    }
}

impl PluginClient for PluginProcess {
    fn info(&self) -> Result<PluginInfo, PluginError> {
        match self.call(RpcCall::Info)? {
            RpcOutcome::Info { version } => Ok(PluginInfo::new(version)),
            other => Err(self.unexpected("info", &other)),
        }
    }

    fn execute(&self, request: &str) -> Result<String, PluginError> {
        let call = RpcCall::Execute {
            request: request.to_owned(),
        };
        match self.call(call)? {
            RpcOutcome::Executed { response } => Ok(response),
            other => Err(self.unexpected("executed", &other)),
        }
    }

    fn process_project(&self, request: &ProcessProjectRequest) -> Result<(), PluginError> {
        match self.call(RpcCall::ProcessProject(request.clone()))? {
            RpcOutcome::Accepted => Ok(()),
            other => Err(self.unexpected("accepted", &other)),
        }
    }

    fn kill(&self) {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut child) = guard.take() {
            terminate(&self.name, &mut child);
        }
    }
}

impl Drop for PluginProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

type Pipes = (
    ChildStdin,
    std::process::ChildStdout,
    std::process::ChildStderr,
);

fn take_pipes(name: &str, child: &mut Child) -> Result<Pipes, PluginError> {
    let missing = |stream: &str| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: format!("failed to capture {stream}"),
        source: None,
    };
    let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
    let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
    Ok((stdin, stdout, stderr))
}

fn spawn_stdout_reader(name: &str, stdout: impl Read + Send + 'static) -> Receiver<io::Result<String>> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let plugin = name.to_owned();
    let spawned = thread::Builder::new()
        .name(String::from("pogo-plugin-stdout"))
        .spawn(move || forward_lines(&plugin, stdout, &sender));
    if let Err(error) = spawned {
        warn!(target: PROCESS_TARGET, plugin = name, %error, "failed to start stdout reader");
    }
    receiver
}

fn forward_lines(name: &str, stdout: impl Read, sender: &Sender<io::Result<String>>) {
    for line in BufReader::new(stdout).lines() {
        let failed = line.is_err();
        if sender.send(line).is_err() || failed {
            break;
        }
    }
    debug!(target: PROCESS_TARGET, plugin = name, "plugin stdout closed");
}

fn spawn_stderr_drain(name: &str, stderr: impl Read + Send + 'static) {
    let plugin = name.to_owned();
    let spawned = thread::Builder::new()
        .name(String::from("pogo-plugin-stderr"))
        .spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                debug!(target: PROCESS_TARGET, plugin = %plugin, stderr = %line, "plugin stderr");
            }
        });
    if let Err(error) = spawned {
        warn!(target: PROCESS_TARGET, plugin = name, %error, "failed to start stderr drain");
    }
}

fn await_handshake(
    name: &str,
    lines: &Receiver<io::Result<String>>,
    expected: &HandshakeConfig,
    timeout: Duration,
) -> Result<(), PluginError> {
    let handshake_error = |source: HandshakeError| PluginError::Handshake {
        name: name.to_owned(),
        source,
    };
    let line = match lines.recv_timeout(timeout) {
        Ok(Ok(line)) => line,
        Ok(Err(err)) => {
            return Err(PluginError::Io {
                name: name.to_owned(),
                source: Arc::new(err),
            });
        }
        Err(RecvTimeoutError::Timeout) => {
            return Err(handshake_error(HandshakeError::TimedOut {
                timeout_secs: timeout.as_secs(),
            }));
        }
        Err(RecvTimeoutError::Disconnected) => return Err(handshake_error(HandshakeError::Closed)),
    };
    let offered: HandshakeConfig = serde_json::from_str(line.trim()).map_err(|err| {
        handshake_error(HandshakeError::Malformed {
            message: err.to_string(),
        })
    })?;
    expected.verify(&offered).map_err(handshake_error)
}

fn write_frame(stdin: &mut ChildStdin, line: &str) -> io::Result<()> {
    stdin.write_all(line.as_bytes())?;
    stdin.write_all(b"\n")?;
    stdin.flush()
}

fn terminate(name: &str, child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: PROCESS_TARGET, plugin = name, %error, "plugin already exited");
    }
    match child.wait() {
        Ok(status) => debug!(target: PROCESS_TARGET, plugin = name, ?status, "plugin process exited"),
        Err(error) => warn!(target: PROCESS_TARGET, plugin = name, %error, "failed to reap plugin"),
    }
}
