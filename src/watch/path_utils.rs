// src/watch/path_utils.rs

//! Path helpers for the watcher.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::FileSystem;

/// How deep below a newly created directory the discovery scan looks.
///
/// Artifact trees are shallow (`<exp>/<run>/artifacts/model`); anything
/// deeper is left to regular notifications.
pub const MAX_DISCOVERY_DEPTH: usize = 6;

/// List every directory below `dir` (not `dir` itself), parents before
/// children, up to `max_depth` levels down.
///
/// A recursive `mkdir -p` can finish before the watch on the new parent is in
/// place, so the creation events for the inner folders are never delivered.
/// Scanning the fresh directory recovers them. Unreadable directories are
/// skipped.
pub fn subdirectories(fs: &dyn FileSystem, dir: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([(dir.to_path_buf(), 0usize)]);

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let mut children = match fs.read_dir(&current) {
            Ok(children) => children,
            Err(e) => {
                debug!(dir = %current.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        children.sort();

        for child in children {
            if fs.is_dir(&child) {
                found.push(child.clone());
                queue.push_back((child, depth + 1));
            }
        }
    }

    found
}
