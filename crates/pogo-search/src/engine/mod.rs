//! The indexing engine behind the "files" search type.
//!
//! [`IndexingEngine`] ties together the [`ProjectRegistry`], the coalescing
//! [`BuildScheduler`] and the optional [`ProjectWatcher`]. Registering a root
//! schedules a background build and returns at once. Each build first puts
//! the root under watch, so create, remove and rename events from then on
//! trigger rebuilds. A watched root that is deleted is dropped from the watch
//! and picked up again by the first build after it reappears. When the OS watch handle cannot be opened the
//! engine keeps working, but listings only refresh on explicit requests.

use std::env;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::SearchError;
use crate::index::builder::build_index;
use crate::index::scheduler::{BuildScheduler, Scheduled};
use crate::index::watcher::ProjectWatcher;
use crate::index::{IndexedProject, Lookup, ProjectRegistry, ProjectState, normalise_root};

/// Tracing target for engine operations.
const ENGINE_TARGET: &str = "pogo_search::engine";

/// Environment variable overriding the number of build workers.
pub const BUILD_WORKERS_ENV: &str = "POGO_SEARCH_BUILD_WORKERS";

/// Build workers used when the environment does not say otherwise.
pub const DEFAULT_BUILD_WORKERS: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(workers) => workers,
    None => NonZeroUsize::MIN,
};

/// Keeps per-project file listings current.
pub struct IndexingEngine {
    registry: Arc<ProjectRegistry>,
    scheduler: Arc<BuildScheduler>,
    watcher: Option<Arc<ProjectWatcher>>,
}

impl std::fmt::Debug for IndexingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingEngine")
            .field("roots", &self.registry.roots())
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl IndexingEngine {
    /// Creates an engine with filesystem watching.
    ///
    /// Failure to open the OS watch handle is logged and the engine falls
    /// back to explicit rebuilds only.
    #[must_use]
    pub fn new(workers: NonZeroUsize) -> Self {
        Self::build(workers, true)
    }

    /// Creates an engine that never watches the filesystem.
    #[must_use]
    pub fn without_watcher(workers: NonZeroUsize) -> Self {
        Self::build(workers, false)
    }

    /// Creates a watching engine sized from [`BUILD_WORKERS_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(workers_from_env())
    }

    fn build(workers: NonZeroUsize, watch: bool) -> Self {
        let registry = Arc::new(ProjectRegistry::default());
        let watcher_slot: Arc<OnceLock<Arc<ProjectWatcher>>> = Arc::new(OnceLock::new());

        let build_registry = Arc::clone(&registry);
        let build_watcher = Arc::clone(&watcher_slot);
        let scheduler = Arc::new(BuildScheduler::new(
            workers,
            Box::new(move |root: &Utf8Path| {
                run_build(&build_registry, build_watcher.get().map(Arc::as_ref), root);
            }),
        ));

        let watcher = if watch {
            start_watcher(&registry, Arc::downgrade(&scheduler))
        } else {
            None
        };
        if let Some(active) = &watcher
            && watcher_slot.set(Arc::clone(active)).is_err()
        {
            warn!(target: ENGINE_TARGET, "watcher slot already set");
        }

        info!(
            target: ENGINE_TARGET,
            workers = workers.get(),
            watching = watcher.is_some(),
            "indexing engine started"
        );
        Self {
            registry,
            scheduler,
            watcher,
        }
    }

    /// Registers `root` for tracking and schedules a build.
    ///
    /// A root that is already tracked is rebuilt. Returns without waiting for
    /// the build.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidRoot`] for empty or relative paths and
    /// [`SearchError::ShuttingDown`] once the engine stops accepting work.
    pub fn process_project(&self, root: &str) -> Result<(), SearchError> {
        let normalised = normalise_root(root).map_err(|reason| SearchError::InvalidRoot {
            root: root.to_owned(),
            reason,
        })?;
        if self.registry.track(&normalised) {
            info!(target: ENGINE_TARGET, root = %normalised, "tracking project");
        } else {
            debug!(target: ENGINE_TARGET, root = %normalised, "project already tracked; rebuilding");
        }
        match self.scheduler.request(&normalised) {
            Scheduled::Closed => Err(SearchError::ShuttingDown),
            Scheduled::Queued | Scheduled::Coalesced => Ok(()),
        }
    }

    /// Rebuilds whichever tracked root owns `path`.
    ///
    /// Paths outside every tracked root are ignored.
    pub fn reindex(&self, path: &Path) {
        if let Some(utf8) = Utf8Path::from_path(path) {
            reindex_owner(&self.registry, &self.scheduler, utf8);
        }
    }

    /// Returns the current snapshot for `root`.
    ///
    /// Never waits for an in-flight build.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NotFound`] for roots that were never processed
    /// and [`SearchError::Pending`] while the first build is still running.
    pub fn get_files(&self, root: &str) -> Result<Arc<IndexedProject>, SearchError> {
        let not_found = || SearchError::NotFound {
            root: root.to_owned(),
        };
        let normalised = normalise_root(root).map_err(|_| not_found())?;
        match self.registry.lookup(&normalised) {
            Lookup::Ready(project) => Ok(project),
            Lookup::Pending => Err(SearchError::Pending {
                root: root.to_owned(),
            }),
            Lookup::Untracked => Err(not_found()),
        }
    }

    /// Lifecycle state of `root`, or `None` if it is not tracked.
    #[must_use]
    pub fn state(&self, root: &str) -> Option<ProjectState> {
        let normalised = normalise_root(root).ok()?;
        match self.registry.lookup(&normalised) {
            Lookup::Untracked => None,
            Lookup::Pending => Some(ProjectState::Indexing),
            Lookup::Ready(_) if self.scheduler.is_building(&normalised) => {
                Some(ProjectState::Indexing)
            }
            Lookup::Ready(_) => Some(ProjectState::Ready),
        }
    }

    /// Every tracked root, sorted.
    #[must_use]
    pub fn tracked_roots(&self) -> Vec<Utf8PathBuf> {
        self.registry.roots()
    }

    /// Returns `true` if `root` is registered with the filesystem watcher.
    #[must_use]
    pub fn is_watching(&self, root: &str) -> bool {
        match (normalise_root(root), &self.watcher) {
            (Ok(normalised), Some(watcher)) => watcher.is_watching(&normalised),
            _ => false,
        }
    }

    /// Blocks until no build is queued or running, or `timeout` elapses.
    ///
    /// Returns `true` if the engine went idle.
    #[must_use]
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.scheduler.wait_for_idle(timeout)
    }
}

impl Drop for IndexingEngine {
    fn drop(&mut self) {
        if let Some(watcher) = &self.watcher {
            watcher.close();
        }
        self.scheduler.shutdown();
        debug!(target: ENGINE_TARGET, "indexing engine stopped");
    }
}

fn run_build(registry: &ProjectRegistry, watcher: Option<&ProjectWatcher>, root: &Utf8Path) {
    // Watch before walking so changes made during the walk queue a rerun.
    if let Some(active) = watcher
        && root.is_dir()
    {
        active.watch_root(root);
    }
    match build_index(root) {
        Ok(project) => {
            debug!(
                target: ENGINE_TARGET,
                root = %root,
                files = project.paths().len(),
                "installing snapshot"
            );
            registry.install(root, project);
        }
        Err(err) => {
            let kept = registry.has_snapshot(root);
            error!(
                target: ENGINE_TARGET,
                root = %root,
                error = %err,
                kept_previous_snapshot = kept,
                "index build failed"
            );
        }
    }
}

fn reindex_owner(registry: &ProjectRegistry, scheduler: &BuildScheduler, path: &Utf8Path) {
    let Some(root) = registry.owning_root(path) else {
        debug!(target: ENGINE_TARGET, path = %path, "change outside tracked roots");
        return;
    };
    if scheduler.request(&root) == Scheduled::Closed {
        debug!(target: ENGINE_TARGET, root = %root, "ignoring change during shutdown");
    }
}

fn start_watcher(
    registry: &Arc<ProjectRegistry>,
    scheduler: Weak<BuildScheduler>,
) -> Option<Arc<ProjectWatcher>> {
    let watch_registry = Arc::clone(registry);
    let on_change = Box::new(move |path: &Utf8Path| {
        if let Some(active) = scheduler.upgrade() {
            reindex_owner(&watch_registry, &active, path);
        }
    });
    match ProjectWatcher::start(on_change) {
        Ok(watcher) => Some(Arc::new(watcher)),
        Err(err) => {
            error!(
                target: ENGINE_TARGET,
                error = %err,
                "could not create file watcher; listings refresh only on explicit requests"
            );
            None
        }
    }
}

fn workers_from_env() -> NonZeroUsize {
    let Ok(raw) = env::var(BUILD_WORKERS_ENV) else {
        return DEFAULT_BUILD_WORKERS;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(
            target: ENGINE_TARGET,
            value = %raw,
            default = DEFAULT_BUILD_WORKERS.get(),
            "ignoring invalid build worker count"
        );
        DEFAULT_BUILD_WORKERS
    })
}
