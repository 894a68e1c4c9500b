//! Reshaping an extracted vault into flat folders of JSON records.
//!
//! Three passes run one after the other, each finishing before the next:
//! prune (drop hidden/underscore dirs and non-notes), convert (note -> JSON
//! sibling), collapse (pull nested files up into their first-level folder).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::notes::{is_note, record_path, transform_note, NoteError};

/// What a flatten run did. Per-note failures land here instead of aborting.
#[derive(Debug, Default)]
pub struct FlattenReport {
    pub pruned_dirs: usize,
    pub pruned_files: usize,
    pub converted: usize,
    pub failures: Vec<NoteFailure>,
    pub moved: usize,
    /// Files left in place because their first-level folder already had that name.
    pub collisions: Vec<PathBuf>,
}

impl FlattenReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A note that could not be converted; it is left as it was.
#[derive(Debug)]
pub struct NoteFailure {
    pub path: PathBuf,
    pub error: NoteError,
}

/// Runs prune, convert and collapse over `root`, in place.
pub fn flatten(root: &Path) -> Result<FlattenReport, FlattenError> {
    if !root.is_dir() {
        return Err(FlattenError::NotADirectory(root.to_path_buf()));
    }
    let mut report = FlattenReport::default();

    let (dirs, files) = prune(root)?;
    report.pruned_dirs = dirs;
    report.pruned_files = files;
    info!(dirs, files, "prune pass done");

    let (converted, failures) = convert(root)?;
    report.converted = converted;
    report.failures = failures;
    info!(converted, failed = report.failures.len(), "convert pass done");

    let (moved, collisions) = collapse(root)?;
    report.moved = moved;
    report.collisions = collisions;
    info!(moved, collisions = report.collisions.len(), "collapse pass done");

    Ok(report)
}

/// Removes directories named `.*` or `_*` (with everything in them) and every
/// file that is not a note. Returns `(dirs removed, files removed)`.
pub fn prune(root: &Path) -> Result<(usize, usize), FlattenError> {
    let mut doomed_dirs = Vec::new();
    let mut doomed_files = Vec::new();

    let mut it = WalkDir::new(root).min_depth(1).follow_links(false).into_iter();
    while let Some(entry) = it.next() {
        let entry = entry.map_err(|e| FlattenError::Walk(e.to_string()))?;
        if entry.file_type().is_dir() {
            if is_excluded_dir(&entry) {
                doomed_dirs.push(entry.into_path());
                it.skip_current_dir();
            }
        } else if !is_note(entry.path()) {
            doomed_files.push(entry.into_path());
        }
    }

    for dir in &doomed_dirs {
        debug!(path = %dir.display(), "removing excluded directory");
        fs::remove_dir_all(dir).map_err(|e| FlattenError::Remove(dir.clone(), e))?;
    }
    for file in &doomed_files {
        debug!(path = %file.display(), "removing non-note file");
        fs::remove_file(file).map_err(|e| FlattenError::Remove(file.clone(), e))?;
    }
    Ok((doomed_dirs.len(), doomed_files.len()))
}

/// Replaces every note under `root` with its JSON record. A note whose record
/// can't be built or written stays untouched and is reported.
pub fn convert(root: &Path) -> Result<(usize, Vec<NoteFailure>), FlattenError> {
    let mut notes = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| FlattenError::Walk(e.to_string()))?;
        if entry.file_type().is_file() && is_note(entry.path()) {
            notes.push(entry.into_path());
        }
    }

    let mut converted = 0;
    let mut failures = Vec::new();
    for note in notes {
        match convert_note(&note, root) {
            Ok(record) => {
                debug!(note = %note.display(), record = %record.display(), "converted");
                converted += 1;
            }
            Err(error) => {
                warn!(note = %note.display(), %error, "note not converted");
                failures.push(NoteFailure { path: note, error });
            }
        }
    }
    Ok((converted, failures))
}

/// Writes the record next to the note, then deletes the note.
fn convert_note(note: &Path, root: &Path) -> Result<PathBuf, NoteError> {
    let record = transform_note(note, root)?;
    let json =
        serde_json::to_string(&record).map_err(|e| NoteError::Serialize(note.to_path_buf(), e))?;
    let target = record_path(note);
    fs::write(&target, json).map_err(|e| NoteError::Write(target.clone(), e))?;
    fs::remove_file(note).map_err(|e| NoteError::Remove(note.to_path_buf(), e))?;
    Ok(target)
}

/// Moves every file nested under a first-level folder of `root` directly into
/// that folder, then removes the folder's subdirectories.
///
/// A file whose name is already taken in the first-level folder is not moved;
/// it goes away with its subdirectory. Returns `(files moved, collisions)`.
pub fn collapse(root: &Path) -> Result<(usize, Vec<PathBuf>), FlattenError> {
    let mut moved = 0;
    let mut collisions = Vec::new();

    for folder in child_dirs(root)? {
        let mut nested = Vec::new();
        for entry in WalkDir::new(&folder).min_depth(2).follow_links(false) {
            let entry = entry.map_err(|e| FlattenError::Walk(e.to_string()))?;
            if !entry.file_type().is_dir() {
                nested.push(entry.into_path());
            }
        }

        for file in nested {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = folder.join(name);
            if target.exists() {
                warn!(file = %file.display(), target = %target.display(), "name taken, not moved");
                collisions.push(file);
                continue;
            }
            match fs::rename(&file, &target) {
                Ok(()) => moved += 1,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "move failed");
                    collisions.push(file);
                }
            }
        }

        for sub in child_dirs(&folder)? {
            debug!(path = %sub.display(), "removing collapsed directory");
            fs::remove_dir_all(&sub).map_err(|e| FlattenError::Remove(sub.clone(), e))?;
        }
    }
    Ok((moved, collisions))
}

fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>, FlattenError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| FlattenError::ReadDir(dir.to_path_buf(), e))? {
        let entry = entry.map_err(|e| FlattenError::ReadDir(dir.to_path_buf(), e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| FlattenError::ReadDir(dir.to_path_buf(), e))?
            .is_dir();
        if is_dir {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    matches!(entry.file_name().as_encoded_bytes().first(), Some(b'.' | b'_'))
}

#[derive(Debug, thiserror::Error)]
pub enum FlattenError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("failed to list {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("failed to remove {0}: {1}")]
    Remove(PathBuf, std::io::Error),
}
