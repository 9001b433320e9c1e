//! Mindcode Watcher - filesystem change watching
//!
//! This crate handles the filesystem side of things:
//! - Per-directory OS watch handles, re-registered when a subtree
//!   changes shape
//! - Mapping raw notifications to an ordered, typed event stream
//! - Clean, idempotent channel shutdown
//!
//! The producer runs as a background blocking task; consumers read a
//! bounded async stream that closes when the channel does.

mod channel;
mod error;
mod event;
mod registry;

pub use channel::{WatchChannel, WatchHandle};
pub use error::{Result, WatchError};
pub use event::{ChangeEvent, ChangeKind, WatchMode};
pub use registry::WatchRegistry;
