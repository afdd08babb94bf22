use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::app::player::PlayerError;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read watch state at {path}: {source}")]
    LoadState {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watch state at {path} is corrupt: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write watch state at {path}: {source}")]
    SaveState {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no previous series to fall back on")]
    NoPreviousSelection,

    #[error("selection {0} is out of range")]
    SelectionOutOfRange(i64),

    #[error("a series named {0:?} already exists")]
    NameCollision(String),

    #[error("no registered series named {0:?}")]
    UnknownSeries(String),

    #[error("cannot move to episode {target} of {count}")]
    NavigationBounds { target: i64, count: usize },

    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error("failed to read user input: {0}")]
    Prompt(#[source] io::Error),
}

impl WatchError {
    /// Selection and navigation errors are handled by re-prompting or
    /// rejecting the action; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoPreviousSelection
                | Self::SelectionOutOfRange(_)
                | Self::NameCollision(_)
                | Self::NavigationBounds { .. }
        )
    }
}
