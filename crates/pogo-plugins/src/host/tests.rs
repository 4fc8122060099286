//! Unit tests for the plugin host.

use std::sync::atomic::Ordering;

use mockall::mock;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::tests::{Candidate, ScriptedLauncher, StubClient, touch_executable};

mock! {
    Launcher {}
    impl PluginLauncher for Launcher {
        fn launch(
            &self,
            manifest: &PluginManifest,
            handshake: &HandshakeConfig,
        ) -> Result<Box<dyn PluginClient>, PluginError>;
    }
}

fn api() -> VersionReq {
    VersionReq::parse(">=0.0.1, <0.1.0").expect("valid range")
}

#[fixture]
fn plugin_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    touch_executable(dir.path(), "alpha");
    touch_executable(dir.path(), "beta");
    dir
}

fn path_of(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

#[rstest]
fn init_loads_every_candidate(plugin_dir: TempDir) {
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), ScriptedLauncher::default());
    host.init().expect("init");
    assert_eq!(
        host.get_plugin_paths(),
        vec![path_of(&plugin_dir, "alpha"), path_of(&plugin_dir, "beta")]
    );
}

#[rstest]
fn failing_candidates_are_excluded(plugin_dir: TempDir) {
    touch_executable(plugin_dir.path(), "forged");
    touch_executable(plugin_dir.path(), "old");
    let launcher = ScriptedLauncher::default();
    launcher.add("forged", Candidate::WrongCookie);
    launcher.add("old", Candidate::OldVersion);
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), launcher);

    host.init().expect("init");

    assert_eq!(host.get_plugin_paths().len(), 2);
    assert!(host.get_plugin(&path_of(&plugin_dir, "forged")).is_none());
    assert!(host.get_plugin(&path_of(&plugin_dir, "old")).is_none());
    // The version-rejected plugin was launched, so it must have been killed.
    assert_eq!(host.launcher.kill_count(), 1);
}

#[rstest]
fn init_is_idempotent(plugin_dir: TempDir) {
    let mut launcher = MockLauncher::new();
    launcher
        .expect_launch()
        .times(2)
        .returning(|_, _| Ok(Box::new(StubClient::default())));
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), launcher);

    host.init().expect("first init");
    host.init().expect("second init");

    assert_eq!(host.get_plugin_paths().len(), 2);
}

#[rstest]
fn launcher_receives_configured_timeouts(plugin_dir: TempDir) {
    let mut launcher = MockLauncher::new();
    launcher
        .expect_launch()
        .withf(|manifest, handshake| {
            manifest.call_timeout() == Duration::from_secs(7)
                && manifest.handshake_timeout() == Duration::from_secs(2)
                && *handshake == HandshakeConfig::search()
        })
        .times(2)
        .returning(|_, _| Ok(Box::new(StubClient::default())));
    let settings = HostSettings::new(plugin_dir.path(), api())
        .with_call_timeout(Duration::from_secs(7))
        .with_handshake_timeout(Duration::from_secs(2));
    let host = PluginHost::new(settings, launcher);

    host.init().expect("init");
}

#[rstest]
fn missing_directory_loads_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().never();
    let host = PluginHost::new(HostSettings::new(dir.path().join("absent"), api()), launcher);

    host.init().expect("init");

    assert!(host.get_plugin_paths().is_empty());
}

#[rstest]
fn lookups_fail_for_unknown_paths(plugin_dir: TempDir) {
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), ScriptedLauncher::default());
    host.init().expect("init");

    let error = host.get_plugin_info("/nowhere").expect_err("unknown");
    assert!(matches!(error, PluginError::NotFound { .. }));
    let error = host.execute("/nowhere", "x").expect_err("unknown");
    assert_eq!(error.error_code(), crate::codec::ErrorCode::NotFound);
}

#[rstest]
fn calls_reach_the_plugin(plugin_dir: TempDir) {
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), ScriptedLauncher::default());
    host.init().expect("init");
    let alpha = path_of(&plugin_dir, "alpha");

    assert_eq!(host.get_plugin_info(&alpha).expect("info").version(), "0.0.1");
    assert_eq!(host.execute(&alpha, "abc").expect("execute"), "handled:abc");
}

#[rstest]
fn process_project_fans_out_and_tolerates_rejection(plugin_dir: TempDir) {
    let accepting = StubClient::default();
    let seen = accepting.projects();
    let mut clients = vec![
        Box::new(StubClient::default().rejecting_projects()) as Box<dyn PluginClient>,
        Box::new(accepting) as Box<dyn PluginClient>,
    ];
    let mut launcher = MockLauncher::new();
    launcher
        .expect_launch()
        .times(2)
        .returning(move |_, _| clients.pop().ok_or_else(|| PluginError::Manifest {
            message: String::from("no more clients"),
        }));
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), launcher);
    host.init().expect("init");

    assert_eq!(host.process_project("/tmp/proj"), 1);
    assert_eq!(
        *seen.lock().expect("projects mutex poisoned"),
        vec![String::from("/tmp/proj")]
    );
}

#[rstest]
fn kill_is_idempotent_and_allows_reinit(plugin_dir: TempDir) {
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), ScriptedLauncher::default());
    host.init().expect("init");

    host.kill();
    host.kill();
    assert!(host.get_plugin_paths().is_empty());
    assert_eq!(host.launcher.kill_count(), 2);

    host.init().expect("re-init");
    assert_eq!(host.get_plugin_paths().len(), 2);
}

#[rstest]
fn dropping_the_host_kills_plugins(plugin_dir: TempDir) {
    let client = StubClient::default();
    let kills = client.kill_count();
    let mut pending = Some(client);
    let mut launcher = MockLauncher::new();
    launcher.expect_launch().times(2).returning(move |_, _| {
        let client: Box<dyn PluginClient> = match pending.take() {
            Some(first) => Box::new(first),
            None => Box::new(StubClient::default()),
        };
        Ok(client)
    });
    let host = PluginHost::new(HostSettings::new(plugin_dir.path(), api()), launcher);
    host.init().expect("init");

    drop(host);

    assert_eq!(kills.load(Ordering::SeqCst), 1);
}
