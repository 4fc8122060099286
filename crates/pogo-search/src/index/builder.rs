//! Full index builds.
//!
//! A build walks the project root without following symlinks and records the
//! absolute path of every regular file, sorted. Entries the walker cannot
//! read, and paths that are not valid UTF-8, are skipped with a warning so a
//! single bad entry never hides the rest of the project.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::IndexError;
use crate::index::IndexedProject;

/// Tracing target for index builds.
const BUILD_TARGET: &str = "pogo_search::build";

/// Builds a fresh snapshot of `root`.
pub(crate) fn build_index(root: &Utf8Path) -> Result<IndexedProject, IndexError> {
    let metadata = fs::metadata(root).map_err(|error| IndexError::Root {
        root: root.to_owned(),
        source: Arc::new(error),
    })?;
    if !metadata.is_dir() {
        return Err(IndexError::NotADirectory {
            root: root.to_owned(),
        });
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name();

    let mut paths = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(error) => {
                warn!(target: BUILD_TARGET, root = %root, %error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => paths.push(path.into_string()),
            Err(path) => warn!(
                target: BUILD_TARGET,
                root = %root,
                path = %path.display(),
                "skipping non UTF-8 path"
            ),
        }
    }
    paths.sort();

    debug!(target: BUILD_TARGET, root = %root, files = paths.len(), "index built");
    Ok(IndexedProject::new(root.as_str(), paths))
}
