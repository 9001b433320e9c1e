//! Watch event model.
//!
//! A [`ChangeEvent`] is one filesystem change with the path already
//! resolved to an absolute location. The optional tag is caller data
//! carried through unchanged; the watcher never looks at it.

use std::path::{Path, PathBuf};

/// What happened to the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Synthetic event sent once when the channel opens, before any
    /// OS-sourced event.
    Initialized,
    /// A file or directory was created.
    Created,
    /// A file or directory was modified.
    Modified,
    /// A file or directory was deleted.
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// One filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,

    /// Absolute path of the changed file or directory.
    pub path: PathBuf,

    /// Opaque correlation data supplied when the channel was opened.
    pub tag: Option<String>,
}

/// How much of the filesystem a channel covers. Fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// One handle on the file's parent directory; events are filtered
    /// to the exact watched file.
    SingleFile,
    /// One handle on the given directory; subdirectories are ignored.
    SingleDirectory,
    /// One handle per directory in the subtree.
    Recursive,
}

impl WatchMode {
    /// Default mode for a path: files get `SingleFile`, everything
    /// else gets `Recursive`.
    pub fn infer(path: &Path) -> Self {
        if path.is_file() {
            Self::SingleFile
        } else {
            Self::Recursive
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_kind_display() {
        assert_eq!(ChangeKind::Initialized.to_string(), "initialized");
        assert_eq!(ChangeKind::Deleted.to_string(), "deleted");
    }

    #[test]
    fn test_infer_mode() {
        let dir = tempdir().unwrap();
        assert_eq!(WatchMode::infer(dir.path()), WatchMode::Recursive);

        let file = dir.path().join("a.mindcode");
        fs::write(&file, "x = 1").unwrap();
        assert_eq!(WatchMode::infer(&file), WatchMode::SingleFile);
    }
}
