//! Handing a flattened vault to its destination.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

/// A destination for flattened vaults. Publishing replaces whatever the
/// destination held before.
pub trait Publisher {
    /// Clears the destination and uploads every file under `vault`, keyed by
    /// its path relative to `vault`. Returns the number of files published.
    fn publish(&self, vault: &Path) -> Result<usize, PublishError>;
}

/// Publishes into a local directory.
#[derive(Debug, Clone)]
pub struct DirPublisher {
    dest: PathBuf,
}

impl DirPublisher {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    fn clear(&self) -> Result<(), PublishError> {
        if !self.dest.exists() {
            return fs::create_dir_all(&self.dest)
                .map_err(|e| PublishError::Clear(self.dest.clone(), e));
        }
        let entries =
            fs::read_dir(&self.dest).map_err(|e| PublishError::Clear(self.dest.clone(), e))?;
        for entry in entries {
            let path = entry.map_err(|e| PublishError::Clear(self.dest.clone(), e))?.path();
            let removed = if path.is_dir() && !path.is_symlink() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| PublishError::Clear(path.clone(), e))?;
        }
        Ok(())
    }
}

impl Publisher for DirPublisher {
    fn publish(&self, vault: &Path) -> Result<usize, PublishError> {
        if !vault.is_dir() {
            return Err(PublishError::NotADirectory(vault.to_path_buf()));
        }
        let vault_abs = resolve(vault);
        let dest_abs = resolve(&self.dest);
        if dest_abs.starts_with(&vault_abs) || vault_abs.starts_with(&dest_abs) {
            return Err(PublishError::Overlap(self.dest.clone(), vault.to_path_buf()));
        }
        self.clear()?;

        let mut count = 0;
        for entry in WalkDir::new(vault).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| PublishError::Walk(e.to_string()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = entry.path().strip_prefix(vault).unwrap_or(entry.path());
            let target = self.dest.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PublishError::Copy(target.clone(), e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| PublishError::Copy(target.clone(), e))?;
            debug!(key = %rel.display(), "published");
            count += 1;
        }
        info!(count, dest = %self.dest.display(), "vault published");
        Ok(count)
    }
}

/// Canonical form of `path`. A tail that doesn't exist yet is appended to its
/// nearest existing ancestor.
fn resolve(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(found) = current.canonicalize() {
            return missing.iter().rev().fold(found, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("destination {0} and vault {1} overlap")]
    Overlap(PathBuf, PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("failed to clear destination {0}: {1}")]
    Clear(PathBuf, std::io::Error),
    #[error("failed to copy to {0}: {1}")]
    Copy(PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_replaces_destination_contents() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        fs::create_dir_all(vault.join("A")).unwrap();
        fs::write(vault.join("A/n.json"), "{}").unwrap();
        fs::write(vault.join("root.json"), "{}").unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir_all(dest.join("Old")).unwrap();
        fs::write(dest.join("Old/gone.json"), "{}").unwrap();
        fs::write(dest.join("stale.json"), "{}").unwrap();

        let count = DirPublisher::new(&dest).publish(&vault).unwrap();
        assert_eq!(count, 2);
        assert!(dest.join("A/n.json").exists());
        assert!(dest.join("root.json").exists());
        assert!(!dest.join("Old").exists());
        assert!(!dest.join("stale.json").exists());
    }

    #[test]
    fn publish_creates_missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        fs::create_dir_all(&vault).unwrap();
        let dest = dir.path().join("out/site");
        assert_eq!(DirPublisher::new(&dest).publish(&vault).unwrap(), 0);
        assert!(dest.is_dir());
    }

    #[test]
    fn publish_refuses_destination_inside_vault() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirPublisher::new(dir.path().join("out"))
            .publish(dir.path())
            .unwrap_err();
        assert!(matches!(err, PublishError::Overlap(..)));
    }

    #[test]
    fn publish_refuses_vault_inside_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let vault = dest.join("vault");
        fs::create_dir_all(vault.join("A")).unwrap();
        fs::write(vault.join("A/n.json"), "{}").unwrap();

        let err = DirPublisher::new(&dest).publish(&vault).unwrap_err();
        assert!(matches!(err, PublishError::Overlap(..)));
        assert!(vault.join("A/n.json").exists());

        // Same directory reached through a `..` detour.
        let detour = vault.join("A").join("..").join("..");
        let err = DirPublisher::new(detour).publish(&vault).unwrap_err();
        assert!(matches!(err, PublishError::Overlap(..)));
        assert!(vault.join("A/n.json").exists());
    }

    #[test]
    fn resolve_keeps_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        assert_eq!(resolve(&dir.path().join("x/y")), base.join("x/y"));
    }
}
