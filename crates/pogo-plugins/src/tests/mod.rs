//! Crate-level test doubles and BDD tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::capability::{PluginInfo, ProcessProjectRequest};
use crate::client::{PluginClient, PluginLauncher};
use crate::error::PluginError;
use crate::handshake::HandshakeConfig;
use crate::manifest::PluginManifest;


/// Client double that records kills and project requests.
pub(crate) struct StubClient {
    version: String,
    kills: Arc<AtomicUsize>,
    projects: Arc<Mutex<Vec<String>>>,
    reject_projects: bool,
}

impl Default for StubClient {
    fn default() -> Self {
        Self::with_version("0.0.1")
    }
}

impl StubClient {
    pub(crate) fn with_version(version: &str) -> Self {
        Self {
            version: version.to_owned(),
            kills: Arc::new(AtomicUsize::new(0)),
            projects: Arc::new(Mutex::new(Vec::new())),
            reject_projects: false,
        }
    }

    pub(crate) fn rejecting_projects(mut self) -> Self {
        self.reject_projects = true;
        self
    }

    pub(crate) fn kill_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.kills)
    }

    pub(crate) fn projects(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.projects)
    }
}

impl PluginClient for StubClient {
    fn info(&self) -> Result<PluginInfo, PluginError> {
        Ok(PluginInfo::new(self.version.clone()))
    }

    fn execute(&self, request: &str) -> Result<String, PluginError> {
        Ok(format!("handled:{request}"))
    }

    fn process_project(&self, request: &ProcessProjectRequest) -> Result<(), PluginError> {
        if self.reject_projects {
            return Err(PluginError::Remote {
                name: String::from("stub"),
                message: String::from("rejected"),
            });
        }
        self.projects
            .lock()
            .expect("projects mutex poisoned")
            .push(request.path().to_owned());
        Ok(())
    }

    fn kill(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the scripted launcher does for a candidate, keyed by file name.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Candidate {
    Plugin,
    WrongCookie,
    OldVersion,
}

/// Launcher double that answers according to the candidate's file name.
#[derive(Default)]
pub(crate) struct ScriptedLauncher {
    candidates: Mutex<Vec<(String, Candidate)>>,
    kills: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub(crate) fn add(&self, name: &str, candidate: Candidate) {
        self.candidates
            .lock()
            .expect("candidates mutex poisoned")
            .push((name.to_owned(), candidate));
    }

    pub(crate) fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

impl PluginLauncher for ScriptedLauncher {
    fn launch(
        &self,
        manifest: &PluginManifest,
        handshake: &HandshakeConfig,
    ) -> Result<Box<dyn PluginClient>, PluginError> {
        let name = manifest
            .executable()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        let candidate = self
            .candidates
            .lock()
            .expect("candidates mutex poisoned")
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(Candidate::Plugin, |(_, c)| *c);
        let scripted = match candidate {
            Candidate::Plugin => StubClient::default(),
            Candidate::OldVersion => StubClient::with_version("1.0.0"),
            Candidate::WrongCookie => {
                let offered = HandshakeConfig::new(
                    handshake.protocol_version(),
                    handshake.magic_cookie_key(),
                    "forged",
                );
                let source = handshake
                    .verify(&offered)
                    .expect_err("forged cookie must be rejected");
                return Err(PluginError::Handshake {
                    name: manifest.identity(),
                    source,
                });
            }
        };
        Ok(Box::new(StubClient {
            kills: Arc::clone(&self.kills),
            ..scripted
        }))
    }
}

/// Creates an executable placeholder file named `name` in `dir`.
pub(crate) fn touch_executable(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write candidate");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod candidate");
    }
    path
}
