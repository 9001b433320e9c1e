//! CLI command implementations.
//!
//! `compile` is the one-shot path. `watch` wires the watch channel to
//! the per-event compile pipeline and runs it against a quit-keystroke
//! task; either the keystroke or a fatal channel failure ends the
//! session, never a single bad file.

use colored::Colorize;
use mindcode_core::Compilation;
use mindcode_watcher::{ChangeEvent, ChangeKind, WatchChannel, WatchHandle, WatchMode};
use std::fs;
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Extension given to compiled output files.
const COMPILED_EXTENSION: &str = "mcode";

/// Fallback when the source already carries the compiled extension,
/// so the output never collides with its own source.
const COMPILED_EXTENSION_ALT: &str = "mc";

/// Side-effect configuration for the watch session.
pub struct WatchOptions {
    /// Source files are those whose name ends with this, case-insensitively.
    pub extension: String,

    /// Write compiled output next to the source.
    pub write: bool,

    /// Replace the clipboard contents with compiled output.
    pub clipboard: bool,

    /// Remove the compiled file when its source is deleted.
    pub delete_compiled: bool,
}

/// Compile one source file.
pub fn compile(
    file: &Path,
    output: Option<&Path>,
    prompt_overwrite: bool,
    json: bool,
) -> Result<()> {
    if !file.exists() {
        return Err(format!("file does not exist: '{}'", file.display()).into());
    }
    if file.is_dir() {
        return Err(format!("'{}' is a directory, not a source file", file.display()).into());
    }

    let out_file = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| compiled_output_path(file));

    if prompt_overwrite
        && out_file.exists()
        && !confirm(&format!("Overwrite '{}'?", out_file.display()))?
    {
        return Err("output file exists".into());
    }

    let result = mindcode_core::compile_file(file)?;
    if !result.is_success() {
        report_diagnostics(&result, json)?;
        return Err("compilation failed".into());
    }

    fs::write(&out_file, result.output.unwrap_or_default())?;
    println!("{} Compiled to {}", "✓".green(), out_file.display());

    Ok(())
}

/// Watch a directory, compiling matching sources as they change.
/// Runs until `q` is read from stdin (or stdin closes).
pub async fn watch(dir: &Path, recursive: bool, options: WatchOptions) -> Result<()> {
    if !dir.exists() {
        return Err(format!("directory does not exist: '{}'", dir.display()).into());
    }
    if !dir.is_dir() {
        return Err(format!("'{}' is not a directory", dir.display()).into());
    }

    let mode = if recursive {
        WatchMode::Recursive
    } else {
        WatchMode::SingleDirectory
    };
    let (channel, handle) = WatchChannel::open(dir, mode, None)?;

    println!(
        "{} Watching {} (press {} to quit)",
        "✓".green(),
        dir.display(),
        "q".cyan()
    );

    let quit_task = tokio::task::spawn_blocking(read_until_quit);
    run_session(channel, handle, options, async move {
        let _ = quit_task.await;
    })
    .await
}

/// Runs the dispatcher against the quit signal until one of them
/// finishes. A quit ends the session cleanly; the dispatcher finishing
/// first means the channel closed underneath us (fatal watch-handle
/// invalidation), which terminates the session with an error instead
/// of sitting on a dead stream waiting for a keystroke.
async fn run_session(
    mut channel: WatchChannel,
    handle: WatchHandle,
    options: WatchOptions,
    quit: impl std::future::Future<Output = ()>,
) -> Result<()> {
    // One event is fully handled before the next is read; compiles
    // never overlap and side effects keep arrival order. The per-event
    // body does filesystem and clipboard work, so it runs as blocking.
    let mut dispatcher = tokio::spawn(async move {
        while let Some(event) = channel.recv().await {
            tokio::task::block_in_place(|| handle_event(&event, &options));
        }
        debug!("event stream closed");
    });
    tokio::pin!(quit);

    tokio::select! {
        _ = &mut quit => {
            info!("shutting down");
            handle.shutdown().await;
            dispatcher.await?;
            Ok(())
        }
        result = &mut dispatcher => {
            result?;
            handle.shutdown().await;
            Err("watch channel closed; session terminated".into())
        }
    }
}

/// Blocks reading stdin until `q` or end-of-input.
fn read_until_quit() {
    let stdin = std::io::stdin();
    for byte in stdin.lock().bytes() {
        match byte {
            Ok(b'q') => {
                debug!("quit character read");
                return;
            }
            Ok(_) => {}
            Err(_) => return,
        }
    }
    debug!("stdin closed");
}

/// Handles one change event: filter, compile, side effects. Failures
/// are reported and the session keeps running.
fn handle_event(event: &ChangeEvent, options: &WatchOptions) {
    if event.kind == ChangeKind::Initialized || event.path.is_dir() {
        return;
    }
    if !matches_extension(&event.path, &options.extension) {
        return;
    }

    debug!("handling {} for '{}'", event.kind, event.path.display());
    match event.kind {
        ChangeKind::Created | ChangeKind::Modified => {
            let result = match mindcode_core::compile_file(&event.path) {
                Ok(result) => result,
                Err(e) => {
                    warn!("{}", e);
                    return;
                }
            };
            if !result.is_success() {
                for diagnostic in &result.diagnostics {
                    eprintln!("{}: {}", event.path.display(), diagnostic);
                }
                return;
            }
            let output = result.output.unwrap_or_default();

            if options.write {
                let out_file = compiled_output_path(&event.path);
                info!("writing '{}'", out_file.display());
                if let Err(e) = fs::write(&out_file, &output) {
                    warn!("failed to write '{}': {}", out_file.display(), e);
                }
            }
            if options.clipboard {
                copy_to_clipboard(&output);
            }
        }
        ChangeKind::Deleted => {
            if options.delete_compiled {
                let out_file = compiled_output_path(&event.path);
                if out_file.exists() {
                    info!("deleting '{}'", out_file.display());
                    if let Err(e) = fs::remove_file(&out_file) {
                        warn!("failed to delete '{}': {}", out_file.display(), e);
                    }
                }
            }
        }
        ChangeKind::Initialized => {}
    }
}

/// Case-insensitive suffix match on the file name, so `A.MINDCODE`
/// and `a.mindcode` are both sources for the default extension.
fn matches_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_lowercase().ends_with(&extension.to_lowercase()))
        .unwrap_or(false)
}

/// Where the compiled output for `source` goes: same directory, same
/// stem, `mcode` extension — or `mc` when that would collide with the
/// source itself.
fn compiled_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}.{}", stem, COMPILED_EXTENSION);
    if Some(name.as_str()) == source.file_name().and_then(|n| n.to_str()) {
        name = format!("{}.{}", stem, COMPILED_EXTENSION_ALT);
    }
    source.with_file_name(name)
}

fn report_diagnostics(result: &Compilation, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(&result.diagnostics)?);
    } else {
        for diagnostic in &result.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Fire and forget: clipboard problems never affect the session.
fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(text.to_string()) {
                warn!("failed to set clipboard: {}", e);
            } else {
                info!("copied output to clipboard");
            }
        }
        Err(e) => warn!("clipboard unavailable: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options() -> WatchOptions {
        WatchOptions {
            extension: "mindcode".into(),
            write: true,
            clipboard: false,
            delete_compiled: false,
        }
    }

    fn event(kind: ChangeKind, path: &Path) -> ChangeEvent {
        ChangeEvent {
            kind,
            path: path.to_path_buf(),
            tag: None,
        }
    }

    #[test]
    fn test_compiled_output_path_replaces_extension() {
        assert_eq!(
            compiled_output_path(Path::new("/w/foo.mindcode")),
            PathBuf::from("/w/foo.mcode")
        );
    }

    #[test]
    fn test_compiled_output_path_never_collides_with_source() {
        let source = Path::new("/w/foo.mcode");
        let out = compiled_output_path(source);
        assert_eq!(out, PathBuf::from("/w/foo.mc"));
        assert_ne!(out, source);
    }

    #[test]
    fn test_compiled_output_path_is_stable() {
        let source = Path::new("/w/foo.mindcode");
        assert_eq!(compiled_output_path(source), compiled_output_path(source));
    }

    #[test]
    fn test_matches_extension_is_case_insensitive() {
        assert!(matches_extension(Path::new("/w/A.MINDCODE"), "mindcode"));
        assert!(matches_extension(Path::new("/w/a.mindcode"), "MindCode"));
        assert!(!matches_extension(Path::new("/w/a.txt"), "mindcode"));
    }

    #[test]
    fn test_modify_writes_compiled_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("ok.mindcode");
        fs::write(&source, "x = 1 + 2").unwrap();

        handle_event(&event(ChangeKind::Modified, &source), &options());

        let compiled = fs::read_to_string(dir.path().join("ok.mcode")).unwrap();
        assert!(compiled.contains("op add x 1 2"));
    }

    #[test]
    fn test_failed_compile_writes_nothing_and_isolates_failure() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.mindcode");
        fs::write(&bad, "x = \"unterminated").unwrap();
        let good = dir.path().join("good.mindcode");
        fs::write(&good, "y = 2").unwrap();

        handle_event(&event(ChangeKind::Modified, &bad), &options());
        handle_event(&event(ChangeKind::Modified, &good), &options());

        // The bad file produced no artifact; the good one still compiled.
        assert!(!dir.path().join("bad.mcode").exists());
        assert!(dir.path().join("good.mcode").exists());
    }

    #[test]
    fn test_write_disabled_produces_no_artifact() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("ok.mindcode");
        fs::write(&source, "x = 1").unwrap();

        let opts = WatchOptions {
            write: false,
            ..options()
        };
        handle_event(&event(ChangeKind::Modified, &source), &opts);

        assert!(!dir.path().join("ok.mcode").exists());
    }

    #[test]
    fn test_non_matching_extension_is_ignored() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, "x = 1").unwrap();

        handle_event(&event(ChangeKind::Modified, &source), &options());

        assert!(!dir.path().join("notes.mcode").exists());
    }

    #[test]
    fn test_directory_events_are_ignored() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub.mindcode");
        fs::create_dir(&sub).unwrap();

        handle_event(&event(ChangeKind::Created, &sub), &options());

        assert!(!dir.path().join("sub.mcode").exists());
    }

    #[test]
    fn test_delete_removes_compiled_output_when_enabled() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("gone.mindcode");
        let compiled = dir.path().join("gone.mcode");
        fs::write(&compiled, "set x 1\nend\n").unwrap();

        let opts = WatchOptions {
            delete_compiled: true,
            ..options()
        };
        handle_event(&event(ChangeKind::Deleted, &source), &opts);

        assert!(!compiled.exists());
    }

    #[test]
    fn test_delete_without_flag_keeps_compiled_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("kept.mindcode");
        let compiled = dir.path().join("kept.mcode");
        fs::write(&compiled, "end\n").unwrap();

        handle_event(&event(ChangeKind::Deleted, &source), &options());

        assert!(compiled.exists());
    }

    #[test]
    fn test_delete_with_no_artifact_is_a_no_op() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("never.mindcode");

        let opts = WatchOptions {
            delete_compiled: true,
            ..options()
        };
        // Must not panic or error; there is nothing to remove.
        handle_event(&event(ChangeKind::Deleted, &source), &opts);
    }

    #[test]
    fn test_compile_command_writes_default_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("prog.mindcode");
        fs::write(&source, "println(\"hi\")").unwrap();

        compile(&source, None, false, false).unwrap();

        let compiled = fs::read_to_string(dir.path().join("prog.mcode")).unwrap();
        assert!(compiled.contains("print \"hi\""));
    }

    #[test]
    fn test_compile_command_honors_explicit_output() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("prog.mindcode");
        let out = dir.path().join("custom.mlog");
        fs::write(&source, "x = 1").unwrap();

        compile(&source, Some(&out), false, false).unwrap();

        assert!(out.exists());
    }

    #[test]
    fn test_compile_command_fails_on_bad_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("bad.mindcode");
        fs::write(&source, "if x\n").unwrap();

        assert!(compile(&source, None, false, false).is_err());
        assert!(!dir.path().join("bad.mcode").exists());
    }

    #[test]
    fn test_compile_command_rejects_directories() {
        let dir = tempdir().unwrap();
        assert!(compile(dir.path(), None, false, false).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_terminates_when_the_channel_closes() {
        let dir = tempdir().unwrap();
        let (channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();

        // Close the channel out from under the session, as a fatal
        // handle invalidation would. The session must end on its own —
        // the quit future never completes.
        handle.close();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            run_session(channel, handle, options(), std::future::pending::<()>()),
        )
        .await
        .expect("session did not terminate after the channel closed");

        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quit_signal_ends_the_session_cleanly() {
        let dir = tempdir().unwrap();
        let (channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            run_session(channel, handle, options(), std::future::ready(())),
        )
        .await
        .expect("session did not shut down after quit");

        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_compiles_changed_sources() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let (channel, handle) =
            WatchChannel::open(dir.path(), WatchMode::Recursive, None).unwrap();

        let source = root.join("live.mindcode");
        let writer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            fs::write(&source, "x = 1 + 2").unwrap();
        });
        let quit = async {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        };

        run_session(channel, handle, options(), quit).await.unwrap();
        writer.await.unwrap();

        let compiled = fs::read_to_string(root.join("live.mcode")).unwrap();
        assert!(compiled.contains("op add x 1 2"));
    }
}
