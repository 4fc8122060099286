//! Per-project file listings and the store that holds them.
//!
//! An [`IndexedProject`] is an immutable snapshot of every file under one
//! project root. The [`ProjectRegistry`] maps roots to their latest snapshot
//! behind a read-write lock; a build replaces the whole `Arc` at once, so a
//! reader observes either the previous listing or the new one, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::Display;

pub(crate) mod builder;
pub(crate) mod scheduler;
pub(crate) mod watcher;

/// The file listing for one project root.
///
/// # Example
///
/// ```
/// use pogo_search::index::IndexedProject;
///
/// let project = IndexedProject::new("/tmp/proj", vec![String::from("/tmp/proj/a.txt")]);
/// assert_eq!(project.root(), "/tmp/proj");
/// assert_eq!(project.paths().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedProject {
    root: String,
    paths: Vec<String>,
}

impl IndexedProject {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(root: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    /// Project root the listing belongs to.
    #[must_use]
    pub const fn root(&self) -> &str {
        self.root.as_str()
    }

    /// Absolute file paths under the root, sorted.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

/// Lifecycle of a tracked project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProjectState {
    /// A build is queued or running, or no snapshot exists yet.
    Indexing,
    /// A snapshot is available and no build is pending.
    Ready,
}

/// Result of looking up a root in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    Untracked,
    Pending,
    Ready(Arc<IndexedProject>),
}

/// Tracked roots and their current snapshots.
#[derive(Debug, Default)]
pub(crate) struct ProjectRegistry {
    projects: RwLock<HashMap<Utf8PathBuf, Option<Arc<IndexedProject>>>>,
}

impl ProjectRegistry {
    /// Starts tracking `root`. Returns `false` if it was already tracked.
    pub(crate) fn track(&self, root: &Utf8Path) -> bool {
        let mut projects = self.write();
        if projects.contains_key(root) {
            return false;
        }
        projects.insert(root.to_owned(), None);
        true
    }

    /// Installs a completed snapshot, replacing the previous one atomically.
    ///
    /// Snapshots for roots that are no longer tracked are dropped.
    pub(crate) fn install(&self, root: &Utf8Path, project: IndexedProject) {
        if let Some(slot) = self.write().get_mut(root) {
            *slot = Some(Arc::new(project));
        }
    }

    /// Returns `true` if the root already has a snapshot.
    pub(crate) fn has_snapshot(&self, root: &Utf8Path) -> bool {
        self.read().get(root).is_some_and(Option::is_some)
    }

    pub(crate) fn lookup(&self, root: &Utf8Path) -> Lookup {
        match self.read().get(root) {
            None => Lookup::Untracked,
            Some(None) => Lookup::Pending,
            Some(Some(project)) => Lookup::Ready(Arc::clone(project)),
        }
    }

    /// Finds the most specific tracked root containing `path`.
    pub(crate) fn owning_root(&self, path: &Utf8Path) -> Option<Utf8PathBuf> {
        self.read()
            .keys()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .cloned()
    }

    /// Every tracked root, sorted.
    pub(crate) fn roots(&self) -> Vec<Utf8PathBuf> {
        let mut roots: Vec<_> = self.read().keys().cloned().collect();
        roots.sort();
        roots
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Utf8PathBuf, Option<Arc<IndexedProject>>>> {
        self.projects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Utf8PathBuf, Option<Arc<IndexedProject>>>> {
        self.projects.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Validates and normalises a project root supplied by a caller.
///
/// Roots must be absolute; redundant separators, `.` components and
/// trailing slashes are removed so equivalent spellings share one entry.
pub(crate) fn normalise_root(root: &str) -> Result<Utf8PathBuf, &'static str> {
    if root.trim().is_empty() {
        return Err("path must not be empty");
    }
    let path = Utf8Path::new(root);
    if !path.is_absolute() {
        return Err("path must be absolute");
    }
    Ok(path.components().collect())
}

#[cfg(test)]
mod tests;
