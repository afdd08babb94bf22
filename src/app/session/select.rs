use std::path::PathBuf;

use tracing::warn;

use super::Session;
use crate::app::library;
use crate::error::WatchError;
use crate::registry::Registry;

/// One row of the watch-next menu: a series with unseen episodes left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickEntry {
    pub name: String,
    pub seen: usize,
    pub episodes: Vec<PathBuf>,
}

impl PickEntry {
    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChoice {
    /// Empty input: fall back to the series chosen last run.
    UseDefault,
    /// 1-based index into the displayed pick-list.
    Index(i64),
}

/// Supplies the user's series choice. The engine hands over the already
/// built pick-list and the default name; parsing raw input happens behind
/// this trait.
pub trait SelectionPrompt {
    fn choose(
        &mut self,
        picks: &[PickEntry],
        default: Option<&str>,
    ) -> Result<SelectionChoice, WatchError>;
}

/// Build the pick-list: series in lexicographic name order, episode lists
/// taken live from disk, fully-watched series excluded (nothing left to
/// resume). A series whose directory cannot be listed is skipped with a
/// warning rather than failing the whole menu.
pub fn pick_list(registry: &Registry) -> Vec<PickEntry> {
    let mut picks = Vec::new();
    for (name, entry) in &registry.series {
        let episodes = match library::episode_files(&entry.path) {
            Ok(episodes) => episodes,
            Err(err) => {
                warn!(series = %name, error = %err, "skipping unlistable series");
                continue;
            }
        };
        if entry.seen >= episodes.len() {
            continue;
        }
        picks.push(PickEntry {
            name: name.clone(),
            seen: entry.seen,
            episodes,
        });
    }
    picks
}

/// Resolve a choice against the pick-list into a session starting at the
/// series' resume position. On success `previous` is updated; on error the
/// registry is untouched and the caller re-prompts.
pub fn resolve(
    registry: &mut Registry,
    picks: &[PickEntry],
    choice: SelectionChoice,
) -> Result<Session, WatchError> {
    let pick = match choice {
        SelectionChoice::UseDefault => {
            let previous = registry
                .previous
                .as_deref()
                .ok_or(WatchError::NoPreviousSelection)?;
            picks
                .iter()
                .find(|pick| pick.name == previous)
                .ok_or(WatchError::NoPreviousSelection)?
        }
        SelectionChoice::Index(index) => {
            if index < 1 {
                return Err(WatchError::SelectionOutOfRange(index));
            }
            picks
                .get(index as usize - 1)
                .ok_or(WatchError::SelectionOutOfRange(index))?
        }
    };

    registry.previous = Some(pick.name.clone());
    Ok(Session {
        series: pick.name.clone(),
        index: pick.seen,
        episodes: pick.episodes.clone(),
    })
}
