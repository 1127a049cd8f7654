use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;
use walkdir::WalkDir;

/// Replaces a leading `~` with the current user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Every entry below `root`, files and directories alike, in file-name order.
///
/// Unreadable entries are logged and skipped; a missing root yields nothing.
pub fn walk_entries(root: &Path) -> Vec<PathBuf> {
    let mut items = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        match entry {
            Ok(entry) => items.push(entry.into_path()),
            Err(err) => tracing::warn!("skipping unreadable entry under {}: {err}", root.display()),
        }
    }
    items
}
