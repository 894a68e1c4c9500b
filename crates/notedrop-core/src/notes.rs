//! Turning a markdown note into the record we publish.
//!
//! The note's raw text is kept whole (front matter included); only the
//! metadata around it is derived.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::dates::{infer_created_date, DateError, NoteTimestamps};

/// Extension of the files treated as notes. Matched case-sensitively.
pub const NOTE_EXTENSION: &str = ".md";

/// Extension of the record written next to each converted note.
pub const RECORD_EXTENSION: &str = ".json";

/// One normalized note, serialized as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// File name without the note extension.
    pub title: String,
    pub created_date: String,
    pub modified_date: String,
    pub modified_time: String,
    /// Containing directory relative to the vault root, `/`-separated. Empty at the root.
    pub path: String,
    /// Last segment of `path`.
    pub folder: String,
    /// Raw file content.
    pub content: String,
}

/// Reads the note at `note_path` and builds its record.
///
/// Does not touch the filesystem beyond reading; writing the record and
/// removing the note is up to the caller.
pub fn transform_note(note_path: &Path, vault_root: &Path) -> Result<NoteRecord, NoteError> {
    let content =
        fs::read_to_string(note_path).map_err(|e| NoteError::Read(note_path.to_path_buf(), e))?;
    let meta =
        fs::metadata(note_path).map_err(|e| NoteError::Read(note_path.to_path_buf(), e))?;
    let timestamps = NoteTimestamps::from_metadata(&meta);
    build_record(note_path, vault_root, content, &timestamps)
}

/// Builds a record from content and timestamps already in hand.
pub fn build_record(
    note_path: &Path,
    vault_root: &Path,
    content: String,
    timestamps: &NoteTimestamps,
) -> Result<NoteRecord, NoteError> {
    let created_date = infer_created_date(note_path, &content, timestamps)
        .map_err(|e| NoteError::Date(note_path.to_path_buf(), e))?;
    let path = relative_dir(note_path, vault_root);
    let folder = path.rsplit('/').next().unwrap_or_default().to_string();
    Ok(NoteRecord {
        title: title_of(note_path),
        created_date,
        modified_date: format_date(&timestamps.modified),
        modified_time: timestamps.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        path,
        folder,
        content,
    })
}

/// Path of the record file that replaces `note_path`.
pub fn record_path(note_path: &Path) -> PathBuf {
    note_path.with_extension(RECORD_EXTENSION.trim_start_matches('.'))
}

/// True if the file name ends with the note extension.
pub fn is_note(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.as_encoded_bytes().ends_with(NOTE_EXTENSION.as_bytes()))
}

fn title_of(note_path: &Path) -> String {
    let name = note_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(NOTE_EXTENSION) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// Directory of `note_path` below `vault_root`, joined with `/`.
fn relative_dir(note_path: &Path, vault_root: &Path) -> String {
    let parent = note_path.parent().unwrap_or(Path::new(""));
    let rel = parent.strip_prefix(vault_root).unwrap_or(parent);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn format_date(t: &DateTime<Local>) -> String {
    t.format("%Y-%m-%d").to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("no creation date for {0}: {1}")]
    Date(PathBuf, DateError),
    #[error("failed to serialize record for {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
    #[error("write error for {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to remove converted note {0}: {1}")]
    Remove(PathBuf, std::io::Error),
}
