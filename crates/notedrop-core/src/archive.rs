//! Vault snapshots: finding the newest one and unpacking it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};

const ARCHIVE_SUFFIXES: [&str; 2] = [".tar.gz", ".tgz"];

/// Unpacks the gzip tarball `archive` into `work_dir`.
///
/// Whatever was in `work_dir` before is removed first; the directory is a
/// disposable staging area. File modification times from the archive are kept.
pub fn extract_archive(archive: &Path, work_dir: &Path) -> Result<(), ArchiveError> {
    if work_dir.exists() {
        debug!(path = %work_dir.display(), "clearing previous working directory");
        fs::remove_dir_all(work_dir)
            .map_err(|e| ArchiveError::Prepare(work_dir.to_path_buf(), e))?;
    }
    fs::create_dir_all(work_dir).map_err(|e| ArchiveError::Prepare(work_dir.to_path_buf(), e))?;

    let file = File::open(archive).map_err(|e| ArchiveError::Open(archive.to_path_buf(), e))?;
    let mut tar = Archive::new(GzDecoder::new(file));
    tar.set_preserve_mtime(true);
    tar.unpack(work_dir)
        .map_err(|e| ArchiveError::Unpack(archive.to_path_buf(), e))?;
    info!(archive = %archive.display(), dest = %work_dir.display(), "archive extracted");
    Ok(())
}

/// The most recently modified archive directly inside `source_dir`.
pub fn latest_archive(source_dir: &Path) -> Result<PathBuf, ArchiveError> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::NotADirectory(source_dir.to_path_buf()));
    }
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let entries =
        fs::read_dir(source_dir).map_err(|e| ArchiveError::List(source_dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::List(source_dir.to_path_buf(), e))?;
        let path = entry.path();
        if !is_archive(&path) {
            continue;
        }
        let meta = entry
            .metadata()
            .map_err(|e| ArchiveError::List(source_dir.to_path_buf(), e))?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map_err(|e| ArchiveError::List(path.clone(), e))?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    newest
        .map(|(_, path)| path)
        .ok_or_else(|| ArchiveError::NoArchive(source_dir.to_path_buf()))
}

/// True for `*.tar.gz` and `*.tgz` file names.
pub fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| ARCHIVE_SUFFIXES.iter().any(|s| n.ends_with(s)))
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("no archive found in {0}")]
    NoArchive(PathBuf),
    #[error("failed to list {0}: {1}")]
    List(PathBuf, std::io::Error),
    #[error("failed to prepare working directory {0}: {1}")]
    Prepare(PathBuf, std::io::Error),
    #[error("failed to open archive {0}: {1}")]
    Open(PathBuf, std::io::Error),
    #[error("failed to unpack {0}: {1}")]
    Unpack(PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    fn make_archive(path: &Path, files: &[(&str, &str)]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_600_000_000);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn extract_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("snap.tar.gz");
        make_archive(&archive, &[("A/n.md", "hello")]);
        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("leftover.json"), "{}").unwrap();

        extract_archive(&archive, &work).unwrap();
        assert!(!work.join("leftover.json").exists());
        assert_eq!(fs::read_to_string(work.join("A/n.md")).unwrap(), "hello");
    }

    #[test]
    fn extract_keeps_archive_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("snap.tgz");
        make_archive(&archive, &[("n.md", "x")]);
        let work = dir.path().join("work");
        extract_archive(&archive, &work).unwrap();
        let modified = fs::metadata(work.join("n.md")).unwrap().modified().unwrap();
        assert_eq!(modified, SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000));
    }

    #[test]
    fn extract_missing_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.tar.gz");
        let err = extract_archive(&missing, &dir.path().join("w")).unwrap_err();
        assert!(matches!(err, ArchiveError::Open(..)));
    }

    #[test]
    fn latest_picks_newest_archive() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("2023-07-01_10-00-00.tar.gz");
        let new = dir.path().join("2023-07-23_15-00-00.tar.gz");
        make_archive(&old, &[]);
        make_archive(&new, &[]);
        fs::write(dir.path().join("notes.txt"), "not an archive").unwrap();
        let f = File::options().write(true).open(&old).unwrap();
        f.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000)).unwrap();

        assert_eq!(latest_archive(dir.path()).unwrap(), new);
    }

    #[test]
    fn latest_without_archives_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "x").unwrap();
        assert!(matches!(latest_archive(dir.path()), Err(ArchiveError::NoArchive(_))));
    }

    #[test]
    fn archive_names() {
        assert!(is_archive(Path::new("a/b.tar.gz")));
        assert!(is_archive(Path::new("b.tgz")));
        assert!(!is_archive(Path::new("b.zip")));
        assert!(!is_archive(Path::new("b.gz")));
    }
}
