//! Where notedrop keeps its own data (config, default working directory).

use std::path::PathBuf;

const WORK_DIR_NAME: &str = "vault";

/// Returns the directory where notedrop stores its config and staging area.
/// On Linux: `~/.local/share/notedrop/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "notedrop", "notedrop")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Default extraction directory, used when none is configured.
pub fn default_work_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join(WORK_DIR_NAME))
}
