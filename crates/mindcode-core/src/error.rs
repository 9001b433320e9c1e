//! Error types for the compiler crate.
//!
//! Syntax problems are not errors here — they come back as ordered
//! [`Diagnostic`](crate::Diagnostic) lists. This module only covers
//! failures outside the source text itself.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for compiler entry points that can fail.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Things that can go wrong before compilation even starts.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Couldn't read the source file from disk.
    #[error("failed to read source file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
