//! Coalescing build scheduler.
//!
//! Builds run on a fixed pool of worker threads fed through a
//! `crossbeam-channel` queue. Each root has at most one build queued or
//! running. A trigger that arrives while a root is building sets its
//! `rerun` flag instead of queueing a second build; the worker that owns the
//! root runs it again once the current build finishes, so builds for one
//! root never interleave while different roots build in parallel.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

/// Tracing target for scheduling.
const SCHEDULER_TARGET: &str = "pogo_search::scheduler";

/// Work performed for one root.
pub(crate) type BuildFn = dyn Fn(&Utf8Path) + Send + Sync;

/// Outcome of a build request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scheduled {
    /// A build was queued.
    Queued,
    /// A build for the root is in flight; it will run once more afterwards.
    Coalesced,
    /// The scheduler no longer accepts work.
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    rerun: bool,
}

struct Shared {
    slots: Mutex<HashMap<Utf8PathBuf, Slot>>,
    idle: Condvar,
    build: Box<BuildFn>,
}

impl Shared {
    fn slots(&self) -> MutexGuard<'_, HashMap<Utf8PathBuf, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs builds on a bounded pool with at most one build per root.
pub(crate) struct BuildScheduler {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<Utf8PathBuf>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BuildScheduler {
    /// Starts `workers` threads running `build`.
    pub(crate) fn new(workers: NonZeroUsize, build: Box<BuildFn>) -> Self {
        let shared = Arc::new(Shared {
            slots: Mutex::new(HashMap::new()),
            idle: Condvar::new(),
            build,
        });
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handles = (0..workers.get())
            .filter_map(|index| spawn_worker(index, Arc::clone(&shared), receiver.clone()))
            .collect();
        Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Requests a build of `root`.
    pub(crate) fn request(&self, root: &Utf8Path) -> Scheduled {
        let sender_guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender_guard.as_ref() else {
            return Scheduled::Closed;
        };
        let mut slots = self.shared.slots();
        if let Some(slot) = slots.get_mut(root) {
            slot.rerun = true;
            debug!(target: SCHEDULER_TARGET, root = %root, "coalescing build request");
            return Scheduled::Coalesced;
        }
        if sender.send(root.to_owned()).is_err() {
            return Scheduled::Closed;
        }
        slots.insert(root.to_owned(), Slot { rerun: false });
        debug!(target: SCHEDULER_TARGET, root = %root, "build queued");
        Scheduled::Queued
    }

    /// Returns `true` while a build for `root` is queued or running.
    pub(crate) fn is_building(&self, root: &Utf8Path) -> bool {
        self.shared.slots().contains_key(root)
    }

    /// Blocks until no build is queued or running, or `timeout` elapses.
    ///
    /// Returns `true` if the scheduler went idle.
    pub(crate) fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.shared.slots();
        while !slots.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            slots = match self.shared.idle.wait_timeout(slots, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    /// Stops accepting work and waits for the workers to drain the queue.
    pub(crate) fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);
        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if handle.join().is_err() {
                warn!(target: SCHEDULER_TARGET, "build worker panicked");
            }
        }
    }
}

impl Drop for BuildScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    index: usize,
    shared: Arc<Shared>,
    receiver: Receiver<Utf8PathBuf>,
) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name(format!("pogo-search-build-{index}"))
        .spawn(move || run_worker(&shared, &receiver));
    match spawned {
        Ok(handle) => Some(handle),
        Err(error) => {
            warn!(target: SCHEDULER_TARGET, index, %error, "failed to start build worker");
            None
        }
    }
}

fn run_worker(shared: &Shared, receiver: &Receiver<Utf8PathBuf>) {
    for root in receiver {
        loop {
            (shared.build)(&root);
            let mut slots = shared.slots();
            match slots.get_mut(&root) {
                Some(slot) if slot.rerun => {
                    slot.rerun = false;
                    debug!(target: SCHEDULER_TARGET, root = %root, "running coalesced rebuild");
                }
                _ => {
                    slots.remove(&root);
                    shared.idle.notify_all();
                    break;
                }
            }
        }
    }
}
