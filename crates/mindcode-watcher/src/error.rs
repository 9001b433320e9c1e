//! Error types for the watcher crate.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for watcher operations that can fail.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Things that can go wrong when opening a watch channel.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The requested path doesn't exist.
    #[error("path does not exist: '{0}'")]
    NotFound(PathBuf),

    /// Single-file mode was asked for something that isn't a file.
    #[error("expected a file to watch, got '{0}'")]
    NotAFile(PathBuf),

    /// Directory modes need an actual directory.
    #[error("expected a directory to watch, got '{0}'")]
    NotADirectory(PathBuf),

    /// Couldn't resolve the path to an absolute location.
    #[error("failed to resolve path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS notification backend refused to start.
    #[error("failed to initialize the filesystem watcher: {0}")]
    Notify(#[from] notify::Error),
}

impl WatchError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
