use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WatchError;

/// Cached audio/subtitle track ids for a series, stored as `[audio, sub]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPair(pub i64, pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub path: PathBuf,
    pub seen: usize,
    #[serde(default)]
    pub tracks: Option<TrackPair>,
}

impl SeriesEntry {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            seen: 0,
            tracks: None,
        }
    }
}

/// The persisted catalog: every known series, the directories the user chose
/// to skip, and the series selected on the previous run.
///
/// The on-disk shape matches the state file layout this tool has always used,
/// so existing files load unchanged:
///
/// ```json
/// {
///   "previous": "Show A",
///   "base_dir": "/anime",
///   "series": { "Show A": { "path": "/anime/A", "seen": 2, "tracks": [1, 3] } },
///   "ignored_directories": ["/anime/extras"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    pub previous: Option<String>,
    pub base_dir: PathBuf,
    pub series: BTreeMap<String, SeriesEntry>,
    pub ignored_directories: BTreeSet<PathBuf>,
}

impl Registry {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            previous: None,
            base_dir,
            series: BTreeMap::new(),
            ignored_directories: BTreeSet::new(),
        }
    }

    /// Reconstruct the registry from the state file. `Ok(None)` means the file
    /// does not exist yet (first run); a present-but-unparsable file is fatal.
    pub fn load(path: &Path) -> Result<Option<Self>, WatchError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(WatchError::LoadState {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let registry = serde_json::from_str(&raw).map_err(|err| WatchError::CorruptState {
            path: path.to_path_buf(),
            source: err,
        })?;
        Ok(Some(registry))
    }

    /// Write the full registry through a temp file and rename, so a crash
    /// mid-save never leaves a truncated state file behind.
    pub fn save(&self, path: &Path) -> Result<(), WatchError> {
        let write = |path: &Path| -> io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
            json.push('\n');
            let tmp = path.with_extension("tmp");
            fs::write(&tmp, json)?;
            fs::rename(&tmp, path)
        };

        write(path).map_err(|err| WatchError::SaveState {
            path: path.to_path_buf(),
            source: err,
        })?;
        debug!(path = %path.display(), "state saved");
        Ok(())
    }

    pub fn is_series_path(&self, path: &Path) -> bool {
        self.series.values().any(|entry| entry.path == path)
    }

    /// Add a new series under `name`. A name that is already taken is
    /// rejected without touching the catalog.
    pub fn register(&mut self, name: &str, path: PathBuf) -> Result<(), WatchError> {
        if self.series.contains_key(name) {
            return Err(WatchError::NameCollision(name.to_string()));
        }
        self.series.insert(name.to_string(), SeriesEntry::new(path));
        Ok(())
    }
}
