//! Watch handle registry.
//!
//! Owns the OS-level watch handles for one channel. Only the channel's
//! producer task ever calls into this, so there is no locking here —
//! exclusive ownership replaces synchronization.

use crate::event::WatchMode;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The live set of per-directory watch handles.
///
/// In recursive mode there is one handle per directory in the subtree;
/// the other modes hold exactly one. Dropping the registry cancels
/// every handle.
pub struct WatchRegistry {
    watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl WatchRegistry {
    pub fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher,
            watched: Vec::new(),
        }
    }

    /// Replaces the current handle set with a fresh one for `root`.
    ///
    /// All previously held handles are cancelled first so nothing
    /// leaks across re-registration. Registration is best-effort: a
    /// directory that vanishes between the tree walk and the watch
    /// call is skipped, not fatal. Returns the number of handles now
    /// held.
    pub fn register(&mut self, root: &Path, mode: WatchMode) -> usize {
        for dir in self.watched.drain(..) {
            if let Err(e) = self.watcher.unwatch(&dir) {
                // Already gone (e.g. the directory was deleted)
                debug!("could not cancel watch on '{}': {}", dir.display(), e);
            }
        }

        match mode {
            WatchMode::Recursive => {
                let dirs: Vec<PathBuf> = WalkDir::new(root)
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_dir())
                    .map(|entry| entry.into_path())
                    .collect();
                for dir in dirs {
                    self.add(&dir);
                }
            }
            WatchMode::SingleFile | WatchMode::SingleDirectory => self.add(root),
        }

        self.watched.len()
    }

    fn add(&mut self, dir: &Path) {
        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => self.watched.push(dir.to_path_buf()),
            // Raced with a concurrent delete; skip the directory
            Err(e) => debug!("skipping '{}': {}", dir.display(), e),
        }
    }

    /// Whether `path` currently holds a watch handle. Used by the
    /// channel to recognize a deleted path as a formerly watched
    /// directory, since `is_dir()` is false once it's gone.
    pub fn is_watched_dir(&self, path: &Path) -> bool {
        self.watched.iter().any(|dir| dir == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn new_registry() -> WatchRegistry {
        let watcher = RecommendedWatcher::new(
            |_: notify::Result<notify::Event>| {},
            notify::Config::default(),
        )
        .unwrap();
        WatchRegistry::new(watcher)
    }

    #[test]
    fn test_recursive_register_covers_every_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        let mut registry = new_registry();
        let count = registry.register(dir.path(), WatchMode::Recursive);

        // root, a, a/b, c
        assert_eq!(count, 4);
        assert!(registry.is_watched_dir(&dir.path().join("a/b")));
    }

    #[test]
    fn test_single_directory_register_holds_one_handle() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut registry = new_registry();
        let count = registry.register(dir.path(), WatchMode::SingleDirectory);

        assert_eq!(count, 1);
        assert!(!registry.is_watched_dir(&dir.path().join("sub")));
    }

    #[test]
    fn test_reregister_replaces_the_handle_set() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("gone");
        fs::create_dir(&gone).unwrap();

        let mut registry = new_registry();
        assert_eq!(registry.register(dir.path(), WatchMode::Recursive), 2);

        fs::remove_dir(&gone).unwrap();
        fs::create_dir(dir.path().join("fresh")).unwrap();

        assert_eq!(registry.register(dir.path(), WatchMode::Recursive), 2);
        assert!(!registry.is_watched_dir(&gone));
        assert!(registry.is_watched_dir(&dir.path().join("fresh")));
    }
}
