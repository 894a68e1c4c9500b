//! Watches the source directory and reports the newest archive whenever one lands.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify_debouncer_mini::notify;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tracing::{debug, info, warn};

use crate::archive::{is_archive, latest_archive, ArchiveError};

/// Watches `source_dir` and calls `on_archive` with the newest archive whenever
/// an archive file there changes (debounced).
/// Blocks until the watcher is stopped (e.g. Ctrl+C).
/// Returns Ok when stopped, Err on setup failure.
pub fn watch_archives(
    source_dir: &Path,
    on_archive: impl Fn(Result<PathBuf, ArchiveError>) + Send + 'static,
) -> Result<(), WatchError> {
    if !source_dir.is_dir() {
        return Err(WatchError::NotADirectory(source_dir.to_path_buf()));
    }
    let source_dir = source_dir.canonicalize().map_err(WatchError::Canonicalize)?;
    let dir_for_callback = source_dir.clone();

    let debounce = Duration::from_millis(400);
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            if !events.iter().any(|e| is_archive(&e.path)) {
                debug!(count = events.len(), "ignoring non-archive changes");
                return;
            }
            on_archive(latest_archive(&dir_for_callback));
        }
        Err(e) => warn!(error = %e, "watcher error"),
    })
    .map_err(|e| WatchError::Notify(e.to_string()))?;

    debouncer
        .watcher()
        .watch(&source_dir, notify::RecursiveMode::NonRecursive)
        .map_err(|e| WatchError::Watch(e.to_string()))?;
    info!(dir = %source_dir.display(), "watching for archives");

    let (_tx, rx) = mpsc::channel::<()>();
    rx.recv().ok();
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("watcher init: {0}")]
    Notify(String),
    #[error("watch failed: {0}")]
    Watch(String),
}
