//! Channel-based wrapper around OS filesystem notifications.
//!
//! [`WatchChannel::open`] starts a background producer that drains raw
//! notifications, maps them to [`ChangeEvent`]s, and publishes them on
//! a bounded stream. The producer owns the [`WatchRegistry`] outright;
//! nothing else touches the handles. Closing is an idempotent message
//! send that also unblocks a pending notification wait, so the quit
//! path and a fatal handle failure are just two writers racing to end
//! the same loop.

use crate::error::{Result, WatchError};
use crate::event::{ChangeEvent, ChangeKind, WatchMode};
use crate::registry::WatchRegistry;
use notify::{EventKind, RecommendedWatcher, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, warn};

/// How many events may sit unconsumed before the producer blocks.
/// Backpressure slows the producer down; events are never dropped.
const EVENT_BUFFER: usize = 64;

/// What the producer can be woken up with. `Batch` and `Broken` come
/// from the notify callback; `Shutdown` from [`WatchHandle::close`].
enum RawSignal {
    Batch(notify::Event),
    Broken(notify::Error),
    Shutdown,
}

/// Consumer side of an open watch: an ordered stream of change events.
/// `recv` returns `None` once the channel has closed.
#[derive(Debug)]
pub struct WatchChannel {
    events: tokio::sync::mpsc::Receiver<ChangeEvent>,
}

impl WatchChannel {
    /// Opens a watch on `path` and starts the background producer.
    ///
    /// The first event on the stream is always `Initialized` for the
    /// configured root. In `SingleFile` mode the handle actually sits
    /// on the parent directory and events are filtered to the exact
    /// file.
    pub fn open(
        path: &Path,
        mode: WatchMode,
        tag: Option<String>,
    ) -> Result<(WatchChannel, WatchHandle)> {
        let root = canonicalize(path)?;
        match mode {
            WatchMode::SingleFile if !root.is_file() => {
                return Err(WatchError::NotAFile(path.to_path_buf()));
            }
            WatchMode::SingleDirectory | WatchMode::Recursive if !root.is_dir() => {
                return Err(WatchError::NotADirectory(path.to_path_buf()));
            }
            _ => {}
        }

        // The directory whose handles we register. Watching a single
        // file means watching its parent.
        let watch_dir = match mode {
            WatchMode::SingleFile => root
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.clone()),
            _ => root.clone(),
        };

        let (raw_tx, raw_rx) = mpsc::channel();
        let callback_tx = raw_tx.clone();
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<notify::Event>| {
                let signal = match result {
                    Ok(event) => RawSignal::Batch(event),
                    Err(e) => RawSignal::Broken(e),
                };
                let _ = callback_tx.send(signal);
            },
            notify::Config::default(),
        )?;
        let registry = WatchRegistry::new(watcher);

        let (events_tx, events_rx) = tokio::sync::mpsc::channel(EVENT_BUFFER);
        let task = tokio::task::spawn_blocking(move || {
            run_producer(registry, raw_rx, events_tx, root, watch_dir, mode, tag);
        });

        Ok((
            WatchChannel { events: events_rx },
            WatchHandle { raw_tx, task },
        ))
    }

    /// Waits for the next change event. `None` means the channel was
    /// closed and no more events will arrive.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

/// Producer-side control for an open watch.
#[derive(Debug)]
pub struct WatchHandle {
    raw_tx: mpsc::Sender<RawSignal>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Closes the channel: cancels every watch handle and ends the
    /// event stream. Idempotent; safe to call while the producer is
    /// blocked waiting for notifications — the wait unblocks promptly.
    pub fn close(&self) {
        // A send failure just means the producer already exited.
        let _ = self.raw_tx.send(RawSignal::Shutdown);
    }

    /// Closes the channel and waits for the producer task to finish.
    pub async fn shutdown(self) {
        self.close();
        let _ = self.task.await;
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WatchError::NotFound(path.to_path_buf())
        } else {
            WatchError::io(path, e)
        }
    })
}

/// The background notification loop. Owns the registry for its whole
/// lifetime; exits on shutdown, fatal handle failure, or a dropped
/// consumer. Dropping the registry on exit cancels every handle, and
/// dropping the sender closes the stream.
fn run_producer(
    mut registry: WatchRegistry,
    raw_rx: mpsc::Receiver<RawSignal>,
    events: tokio::sync::mpsc::Sender<ChangeEvent>,
    root: PathBuf,
    watch_dir: PathBuf,
    mode: WatchMode,
    tag: Option<String>,
) {
    // The synthetic initialization event goes out before anything the
    // OS reports.
    let initialized = ChangeEvent {
        kind: ChangeKind::Initialized,
        path: root.clone(),
        tag: tag.clone(),
    };
    if events.blocking_send(initialized).is_err() {
        return;
    }

    let count = registry.register(&watch_dir, mode);
    debug!(
        "watching {} directories under '{}'",
        count,
        watch_dir.display()
    );

    loop {
        let signal = match raw_rx.recv() {
            Ok(signal) => signal,
            Err(_) => break,
        };
        match signal {
            RawSignal::Shutdown => {
                debug!("watch channel closed");
                break;
            }
            RawSignal::Broken(e) => {
                warn!("watch handle became invalid, closing the channel: {}", e);
                break;
            }
            RawSignal::Batch(event) => {
                let kind = match event.kind {
                    EventKind::Create(_) => ChangeKind::Created,
                    EventKind::Remove(_) => ChangeKind::Deleted,
                    // Reads are not changes
                    EventKind::Access(_) => continue,
                    _ => ChangeKind::Modified,
                };

                let mut needs_reregister = false;
                for path in &event.paths {
                    if mode == WatchMode::SingleFile && *path != root {
                        continue;
                    }

                    // A subtree changed shape: refresh the handle set,
                    // but only after this whole batch has gone out.
                    if mode == WatchMode::Recursive {
                        let dir_created = kind == ChangeKind::Created && path.is_dir();
                        let dir_deleted =
                            kind == ChangeKind::Deleted && registry.is_watched_dir(path);
                        if dir_created || dir_deleted {
                            needs_reregister = true;
                        }
                    }

                    let change = ChangeEvent {
                        kind,
                        path: path.clone(),
                        tag: tag.clone(),
                    };
                    if events.blocking_send(change).is_err() {
                        // Consumer is gone, nothing left to publish to
                        return;
                    }
                }

                if needs_reregister {
                    let count = registry.register(&watch_dir, mode);
                    debug!("re-registered {} directories", count);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn next_event(channel: &mut WatchChannel) -> ChangeEvent {
        tokio::time::timeout(Duration::from_secs(10), channel.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("channel closed unexpectedly")
    }

    /// Reads events until one matches `pred`, with an overall timeout.
    async fn wait_for(
        channel: &mut WatchChannel,
        mut pred: impl FnMut(&ChangeEvent) -> bool,
    ) -> ChangeEvent {
        loop {
            let event = next_event(channel).await;
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_initialized_is_the_first_event() {
        let dir = tempdir().unwrap();
        let (mut channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, Some("t1".into())).unwrap();

        let first = next_event(&mut channel).await;
        assert_eq!(first.kind, ChangeKind::Initialized);
        assert_eq!(first.path, dir.path().canonicalize().unwrap());
        assert_eq!(first.tag.as_deref(), Some("t1"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_created_file_is_reported() {
        let dir = tempdir().unwrap();
        let (mut channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::SingleDirectory, None).unwrap();

        assert_eq!(next_event(&mut channel).await.kind, ChangeKind::Initialized);

        let file = dir.path().canonicalize().unwrap().join("new.mindcode");
        fs::write(&file, "x = 1").unwrap();

        let event = wait_for(&mut channel, |e| e.path == file).await;
        assert_ne!(event.kind, ChangeKind::Deleted);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_file_mode_filters_other_paths() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let watched = root.join("watched.mindcode");
        let other = root.join("other.mindcode");
        fs::write(&watched, "x = 1").unwrap();
        fs::write(&other, "y = 2").unwrap();

        let (mut channel, handle) =
            WatchChannel::open(&watched, WatchMode::SingleFile, None).unwrap();
        assert_eq!(next_event(&mut channel).await.kind, ChangeKind::Initialized);

        // Churn on the unwatched sibling, then touch the watched file.
        // Every sibling event must have been filtered out, so the next
        // thing on the stream is for the watched file.
        for _ in 0..3 {
            fs::write(&other, "y = 3").unwrap();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&watched, "x = 2").unwrap();

        let event = next_event(&mut channel).await;
        assert_eq!(event.path, watched);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_new_subdirectory_becomes_watched() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (mut channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();
        assert_eq!(next_event(&mut channel).await.kind, ChangeKind::Initialized);

        let sub = root.join("sub");
        fs::create_dir(&sub).unwrap();
        wait_for(&mut channel, |e| e.path == sub).await;

        // Give the producer a moment to finish re-registering, then
        // change a file inside the new directory.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let inner = sub.join("inner.mindcode");
        fs::write(&inner, "x = 1").unwrap();

        let event = wait_for(&mut channel, |e| e.path == inner).await;
        assert_ne!(event.kind, ChangeKind::Initialized);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_ends_the_stream() {
        let dir = tempdir().unwrap();
        let (mut channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();

        handle.close();
        handle.close();

        // Initialized may or may not already be queued; either way the
        // stream must terminate.
        let ended = tokio::time::timeout(Duration::from_secs(10), async {
            while channel.recv().await.is_some() {}
        })
        .await;
        assert!(ended.is_ok(), "stream did not terminate after close");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reopening_the_same_root_succeeds() {
        let dir = tempdir().unwrap();

        let (_channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();
        handle.shutdown().await;

        let (_channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_missing_path_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = WatchChannel::open(&missing, WatchMode::Recursive, None).unwrap_err();
        assert!(matches!(err, WatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_single_file_mode_rejects_directories() {
        let dir = tempdir().unwrap();
        let err = WatchChannel::open(dir.path(), WatchMode::SingleFile, None).unwrap_err();
        assert!(matches!(err, WatchError::NotAFile(_)));
    }
}
