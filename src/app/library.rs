use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::WatchError;

/// List the immediate subdirectories of `path`, sorted lexicographically.
/// Hidden entries (dot-prefixed) are skipped.
pub fn subdirectories(path: &Path) -> Result<Vec<PathBuf>, WatchError> {
    list_entries(path, |file_type| file_type.is_dir())
}

/// List the episode files of a series directory, sorted lexicographically
/// ascending. Episode order is purely the filename sort order; the position
/// of a file in this list is its 0-based episode index.
pub fn episode_files(path: &Path) -> Result<Vec<PathBuf>, WatchError> {
    list_entries(path, |file_type| file_type.is_file())
}

fn list_entries(
    path: &Path,
    keep: impl Fn(&fs::FileType) -> bool,
) -> Result<Vec<PathBuf>, WatchError> {
    let scan_err = |source| WatchError::Scan {
        path: path.to_path_buf(),
        source,
    };

    let mut out = Vec::new();
    for entry in fs::read_dir(path).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        match entry.file_type() {
            Ok(file_type) if keep(&file_type) => out.push(entry.path()),
            Ok(_) => {}
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "skipping unreadable entry");
            }
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn episode_files_are_sorted_and_exclude_hidden_and_dirs() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("e2.mkv")).unwrap();
        File::create(dir.path().join("e1.mkv")).unwrap();
        File::create(dir.path().join(".hidden.mkv")).unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let files = episode_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("e1.mkv"), dir.path().join("e2.mkv")]
        );
    }

    #[test]
    fn subdirectories_exclude_files_and_hidden() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("b-show")).unwrap();
        fs::create_dir(dir.path().join("a-show")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        File::create(dir.path().join("stray.txt")).unwrap();

        let dirs = subdirectories(dir.path()).unwrap();
        assert_eq!(
            dirs,
            vec![dir.path().join("a-show"), dir.path().join("b-show")]
        );
    }

    #[test]
    fn missing_path_surfaces_scan_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        match episode_files(&missing) {
            Err(WatchError::Scan { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Scan error, got {other:?}"),
        }
    }
}
