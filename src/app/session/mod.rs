mod controller;
mod select;

pub(crate) use controller::{PollOutcome, SessionController, TrackPrompt, WATCHED_THRESHOLD};
pub(crate) use select::{PickEntry, SelectionChoice, SelectionPrompt, pick_list, resolve};

use std::path::PathBuf;

/// One process run's active viewing state. Only its effects on the registry
/// (`seen`, cached tracks, `previous`) outlive the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Registry key of the series being watched.
    pub series: String,
    /// 0-based index into `episodes`; equals the series' `seen` count at
    /// session start.
    pub index: usize,
    /// Episode paths listed fresh from disk at session start.
    pub episodes: Vec<PathBuf>,
}

impl Session {
    /// Display title for the current episode, e.g. `Show A - E3`.
    pub fn title(&self) -> String {
        format!("{} - E{}", self.series, self.index + 1)
    }

    pub fn current_episode(&self) -> &PathBuf {
        &self.episodes[self.index]
    }
}
