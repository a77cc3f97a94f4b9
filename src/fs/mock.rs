// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
///
/// Parent directories are created implicitly, the same way `mkdir -p` would.
/// Clones share the same underlying tree, so a test can hand one clone to the
/// engine and keep mutating another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        Self::ensure_dirs(&mut entries, path.as_ref());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock().retain(|p, _| !p.starts_with(path));
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_create_their_parent_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/a/b/c.txt", b"x".to_vec());

        assert!(fs.is_dir(Path::new("/a")));
        assert!(fs.is_dir(Path::new("/a/b")));
        assert!(fs.exists(Path::new("/a/b/c.txt")));
        assert!(!fs.is_dir(Path::new("/a/b/c.txt")));
        assert_eq!(
            fs.read_dir(Path::new("/a")).unwrap(),
            vec![PathBuf::from("/a/b")]
        );
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("/a/b/c.txt", b"x".to_vec());
        fs.remove("/a/b");

        assert!(fs.exists(Path::new("/a")));
        assert!(!fs.exists(Path::new("/a/b/c.txt")));
        assert!(fs.read_dir(Path::new("/a/b")).is_err());
    }
}
