//! Filesystem watching for tracked project roots.
//!
//! One `notify` watcher serves every root. Its callback forwards events over
//! a channel to a single named thread, which maps path-set changes (create,
//! remove, rename) to the owning root and hands them to `on_change`. Content
//! modifications are ignored because they do not change the listing.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::Receiver;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

/// Tracing target for filesystem watching.
const WATCH_TARGET: &str = "pogo_search::watcher";

/// Callback invoked with every path whose listing may have changed.
pub(crate) type ChangeFn = dyn Fn(&Utf8Path) + Send + Sync;

/// Returns the paths of `event` that can change a project's file listing.
pub(crate) fn listing_changes(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            &event.paths
        }
        _ => &[],
    }
}

type WatchedRoots = Arc<Mutex<HashSet<Utf8PathBuf>>>;

/// Watches project roots and reports listing changes.
pub(crate) struct ProjectWatcher {
    watcher: Mutex<Option<RecommendedWatcher>>,
    roots: WatchedRoots,
}

impl ProjectWatcher {
    /// Opens the OS watch handle and starts the event thread.
    pub(crate) fn start(on_change: Box<ChangeFn>) -> notify::Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| {
                if sender.send(event).is_err() {
                    debug!(target: WATCH_TARGET, "event consumer has stopped");
                }
            },
            Config::default(),
        )?;
        let roots = WatchedRoots::default();
        let event_roots = Arc::clone(&roots);
        thread::Builder::new()
            .name(String::from("pogo-search-watch"))
            .spawn(move || consume_events(&receiver, &event_roots, on_change.as_ref()))
            .map_err(notify::Error::io)?;
        Ok(Self {
            watcher: Mutex::new(Some(watcher)),
            roots,
        })
    }

    /// Watches `root` recursively unless it is already watched.
    pub(crate) fn watch_root(&self, root: &Utf8Path) {
        let mut guard = lock(&self.watcher);
        let Some(watcher) = guard.as_mut() else {
            return;
        };
        if lock(&self.roots).contains(root) {
            return;
        }
        match watcher.watch(root.as_std_path(), RecursiveMode::Recursive) {
            Ok(()) => {
                info!(target: WATCH_TARGET, root = %root, "watching project root");
                lock(&self.roots).insert(root.to_owned());
            }
            Err(err) => warn!(
                target: WATCH_TARGET,
                root = %root,
                error = %err,
                "failed to watch project root; listing may go stale"
            ),
        }
    }

    /// Returns `true` if `root` is being watched.
    pub(crate) fn is_watching(&self, root: &Utf8Path) -> bool {
        lock(&self.roots).contains(root)
    }

    /// Drops the OS watch handle, which ends the event thread.
    pub(crate) fn close(&self) {
        let mut guard = lock(&self.watcher);
        lock(&self.roots).clear();
        if guard.take().is_some() {
            debug!(target: WATCH_TARGET, "watcher closed");
        }
    }
}

impl Drop for ProjectWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Forgets every watched root that `event` removes or renames away.
///
/// The OS drops its watch together with the directory, so a forgotten root
/// is watched afresh by the next successful build.
fn forget_vanished_roots(roots: &Mutex<HashSet<Utf8PathBuf>>, event: &Event) {
    if !matches!(
        event.kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    ) {
        return;
    }
    let mut watched = lock(roots);
    for path in &event.paths {
        if let Some(root) = Utf8Path::from_path(path)
            && watched.remove(root)
        {
            info!(target: WATCH_TARGET, root = %root, "watched project root went away");
        }
    }
}

fn consume_events(
    receiver: &Receiver<notify::Result<Event>>,
    roots: &Mutex<HashSet<Utf8PathBuf>>,
    on_change: &ChangeFn,
) {
    for received in receiver {
        match received {
            Ok(event) => {
                forget_vanished_roots(roots, &event);
                for path in listing_changes(&event) {
                    let Some(utf8) = Utf8Path::from_path(path) else {
                        warn!(target: WATCH_TARGET, path = %path.display(), "ignoring non UTF-8 path");
                        continue;
                    };
                    debug!(target: WATCH_TARGET, path = %utf8, kind = ?event.kind, "listing change");
                    on_change(utf8);
                }
            }
            Err(err) => error!(target: WATCH_TARGET, error = %err, "file watcher error"),
        }
    }
    debug!(target: WATCH_TARGET, "watch event stream closed");
}
