//! Test doubles shared by the daemon suites.

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mockall::mock;
use ortho_config::{OrthoConfig, OrthoError};
use pogo_config::Config;
use pogo_plugins::client::{PluginClient, PluginLauncher};
use pogo_plugins::handshake::HandshakeConfig;
use pogo_plugins::{PluginError, PluginInfo, PluginManifest, ProcessProjectRequest};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::shutdown::{ShutdownError, ShutdownSignal};

mock! {
    pub Signal {}

    impl ShutdownSignal for Signal {
        fn wait(&self) -> Result<(), ShutdownError>;
    }
}

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded(Vec<String>),
    BootstrapFailed(String),
    ShutdownStarting,
    ShutdownCompleted,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, plugins: &[String]) {
        self.record(HealthEvent::BootstrapSucceeded(plugins.to_vec()));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn shutdown_starting(&self) {
        self.record(HealthEvent::ShutdownStarting);
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}

/// Loader that fails by passing an unparsable CLI value.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("pogod"),
            OsString::from("--call-timeout-secs"),
            OsString::from("soon"),
        ];
        Config::load_from_iter(args)
    }
}

/// Client that answers every call without a process behind it.
struct StubClient {
    kills: Arc<AtomicUsize>,
}

impl PluginClient for StubClient {
    fn info(&self) -> Result<PluginInfo, PluginError> {
        Ok(PluginInfo::new("0.0.1"))
    }

    fn execute(&self, request: &str) -> Result<String, PluginError> {
        Ok(request.to_owned())
    }

    fn process_project(&self, _request: &ProcessProjectRequest) -> Result<(), PluginError> {
        Ok(())
    }

    fn kill(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
    }
}

/// Launcher handing out [`StubClient`]s and counting their kills.
#[derive(Debug, Default, Clone)]
pub struct StubLauncher {
    kills: Arc<AtomicUsize>,
}

impl StubLauncher {
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

impl PluginLauncher for StubLauncher {
    fn launch(
        &self,
        _manifest: &PluginManifest,
        _handshake: &HandshakeConfig,
    ) -> Result<Box<dyn PluginClient>, PluginError> {
        Ok(Box::new(StubClient {
            kills: Arc::clone(&self.kills),
        }))
    }
}

/// Creates an executable placeholder named `name` under `dir`.
pub fn touch_executable(dir: &Path, name: &str) {
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\n").expect("write plugin placeholder");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("mark executable");
}

/// Configuration pointing at `plugin_dir` with quiet logging.
pub fn config_for(plugin_dir: &Path) -> Config {
    Config::default()
        .with_plugin_dir(plugin_dir.to_str().expect("utf-8 plugin dir"))
        .with_log_filter("warn")
}
