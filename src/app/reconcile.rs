use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::library;
use crate::error::WatchError;
use crate::registry::Registry;

/// What to do with a directory the registry has never seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryDecision {
    /// Skip it for this run.
    Ignore,
    /// Track it as a series under the given name.
    Register(String),
    /// Not a series itself; classify its immediate subdirectories instead.
    Recurse,
}

/// Supplies classification decisions for unknown directories. The engine
/// never reads raw input itself.
pub trait DirectoryClassifier {
    fn classify(&mut self, path: &Path) -> Result<DirectoryDecision, WatchError>;

    /// Called when a `Register` name is already taken; `classify` will be
    /// asked again for the same path.
    fn name_taken(&mut self, _name: &str) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub registered: usize,
    pub ignored: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.registered == 0 && self.ignored == 0
    }
}

/// Bring the registry's path classification in line with the filesystem.
///
/// Ignores are not permanent bans: the previous run's set is only a snapshot,
/// and a directory stays ignored solely because it shows up in that snapshot
/// again. Anything on disk that is neither a series path nor snapshot-ignored
/// goes through the classifier, and `Recurse` widens the worklist with the
/// directory's own subdirectories.
pub fn reconcile(
    registry: &mut Registry,
    classifier: &mut dyn DirectoryClassifier,
) -> Result<ReconcileReport, WatchError> {
    let snapshot = std::mem::take(&mut registry.ignored_directories);
    let base_dir = registry.base_dir.clone();

    let mut report = ReconcileReport::default();
    let mut undecided = collect_unknown(registry, &base_dir, &snapshot)?;

    let mut next = 0;
    while next < undecided.len() {
        let path = undecided[next].clone();
        next += 1;

        loop {
            match classifier.classify(&path)? {
                DirectoryDecision::Ignore => {
                    registry.ignored_directories.insert(path);
                    report.ignored += 1;
                    break;
                }
                DirectoryDecision::Register(name) => {
                    match registry.register(&name, path.clone()) {
                        Ok(()) => {
                            info!(name = %name, path = %path.display(), "registered series");
                            report.registered += 1;
                            break;
                        }
                        Err(WatchError::NameCollision(name)) => {
                            classifier.name_taken(&name);
                        }
                        Err(err) => return Err(err),
                    }
                }
                DirectoryDecision::Recurse => {
                    registry.ignored_directories.insert(path.clone());
                    report.ignored += 1;
                    let mut children = collect_unknown(registry, &path, &snapshot)?;
                    undecided.append(&mut children);
                    break;
                }
            }
        }
    }

    debug!(
        registered = report.registered,
        ignored = report.ignored,
        "reconciliation complete"
    );
    Ok(report)
}

/// Subdirectories of `path` that are not registered as a series. Ones found
/// in the previous run's ignore snapshot are silently re-ignored; the rest
/// are returned for classification.
fn collect_unknown(
    registry: &mut Registry,
    path: &Path,
    snapshot: &BTreeSet<PathBuf>,
) -> Result<Vec<PathBuf>, WatchError> {
    let mut unknown = Vec::new();
    for dir in library::subdirectories(path)? {
        if registry.is_series_path(&dir) {
            continue;
        }
        if snapshot.contains(&dir) {
            registry.ignored_directories.insert(dir);
        } else {
            unknown.push(dir);
        }
    }
    Ok(unknown)
}
