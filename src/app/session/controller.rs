use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::Session;
use crate::app::player::{MediaPlayer, PlayState, TrackInfo};
use crate::app::remote::PlaybackListener;
use crate::error::WatchError;
use crate::registry::{Registry, SeriesEntry, TrackPair};

/// Playback fraction above which an episode counts as fully watched.
pub const WATCHED_THRESHOLD: f64 = 0.9;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies the audio/subtitle choice the first time a series is played.
pub trait TrackPrompt {
    fn choose_tracks(
        &mut self,
        audio: &[TrackInfo],
        subtitles: &[TrackInfo],
    ) -> Result<(i64, i64), WatchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Selecting,
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Playback continues; nothing to do.
    Running,
    /// The current episode played through to its end.
    Ended,
    /// The player process or its IPC channel is gone; shut the session down.
    PlayerGone,
}

/// The active session. The only place `seen` and the current episode index
/// ever change, and every mutation is persisted before the next event is
/// accepted.
pub struct SessionController<P: MediaPlayer, L: PlaybackListener> {
    registry: Registry,
    state_path: PathBuf,
    session: Session,
    player: P,
    listener: L,
    phase: Phase,
    eof_recorded: bool,
}

impl<P: MediaPlayer, L: PlaybackListener> SessionController<P, L> {
    pub fn new(
        registry: Registry,
        state_path: PathBuf,
        session: Session,
        player: P,
        listener: L,
    ) -> Self {
        Self {
            registry,
            state_path,
            session,
            player,
            listener,
            phase: Phase::Selecting,
            eof_recorded: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn entry_mut(&mut self) -> Result<&mut SeriesEntry, WatchError> {
        self.registry
            .series
            .get_mut(&self.session.series)
            .ok_or_else(|| WatchError::UnknownSeries(self.session.series.clone()))
    }

    fn persist(&self) -> Result<(), WatchError> {
        self.registry.save(&self.state_path)
    }

    /// Load the current episode, reapply the cached track choice, and play.
    fn load_current(&mut self) -> Result<(), WatchError> {
        let path = self.session.current_episode().clone();
        self.player.load(&path)?;
        if let Some(TrackPair(audio, subtitles)) = self.entry_mut()?.tracks {
            self.player.select_tracks(audio, subtitles)?;
        }
        self.player.play()?;
        self.eof_recorded = false;
        self.phase = Phase::Playing;
        let title = self.session.title();
        info!(title = %title, "playing");
        self.listener.title_changed(&title);
        Ok(())
    }

    /// Begin playback of the resume episode: start, wait (bounded) for the
    /// player to actually come up, settle the track selection while paused,
    /// then resume.
    pub fn start(&mut self, tracks: &mut dyn TrackPrompt) -> Result<(), WatchError> {
        let path = self.session.current_episode().clone();
        self.player.load(&path)?;
        self.player.play()?;
        self.player.wait_until_playing(STARTUP_TIMEOUT)?;
        self.player.pause()?;

        self.ensure_track_selection(tracks)?;

        self.player.play()?;
        self.eof_recorded = false;
        self.phase = Phase::Playing;
        let title = self.session.title();
        info!(title = %title, "session started");
        self.listener.title_changed(&title);
        self.listener.play_pause_changed(PlayState::Playing);
        Ok(())
    }

    /// Prompt for audio/subtitle tracks once per series, cache the choice on
    /// the series entry, and apply it to the player. Later episodes and later
    /// runs reuse the cache without prompting.
    pub fn ensure_track_selection(
        &mut self,
        prompt: &mut dyn TrackPrompt,
    ) -> Result<(), WatchError> {
        let cached = self.entry_mut()?.tracks;
        let TrackPair(audio, subtitles) = match cached {
            Some(pair) => pair,
            None => {
                let audio_tracks = self.player.audio_tracks()?;
                let subtitle_tracks = self.player.subtitle_tracks()?;
                if audio_tracks.is_empty() && subtitle_tracks.is_empty() {
                    // Nothing to choose from; keep the player defaults and
                    // ask again next time the media exposes tracks.
                    return Ok(());
                }
                let (audio, subtitles) = prompt.choose_tracks(&audio_tracks, &subtitle_tracks)?;
                let pair = TrackPair(audio, subtitles);
                self.entry_mut()?.tracks = Some(pair);
                self.persist()?;
                pair
            }
        };
        self.player.select_tracks(audio, subtitles)?;
        Ok(())
    }

    /// Move to the next episode. Index and `seen` advance in lockstep, so
    /// `seen` keeps doubling as the resume point.
    pub fn advance(&mut self) -> Result<(), WatchError> {
        let next = self.session.index + 1;
        let count = self.session.episodes.len();
        if next >= count {
            return Err(WatchError::NavigationBounds {
                target: next as i64 + 1,
                count,
            });
        }
        self.session.index = next;
        let entry = self.entry_mut()?;
        entry.seen = (entry.seen + 1).min(count);
        self.persist()?;
        self.load_current()
    }

    /// Move back one episode, symmetrically undoing the progress step.
    pub fn retreat(&mut self) -> Result<(), WatchError> {
        if self.session.index == 0 {
            return Err(WatchError::NavigationBounds {
                target: 0,
                count: self.session.episodes.len(),
            });
        }
        self.session.index -= 1;
        let entry = self.entry_mut()?;
        entry.seen = entry.seen.saturating_sub(1);
        self.persist()?;
        self.load_current()
    }

    /// Evaluate a playback-stop position. Past the watched threshold the
    /// episode counts as seen even without an explicit `advance` (the player
    /// reached the end and the user quit instead of skipping forward).
    /// Returns whether `seen` moved.
    pub fn record_progress(&mut self, fraction: f64) -> Result<bool, WatchError> {
        if fraction <= WATCHED_THRESHOLD {
            return Ok(false);
        }
        let count = self.session.episodes.len();
        let entry = self.entry_mut()?;
        if entry.seen >= count {
            return Ok(false);
        }
        entry.seen += 1;
        let seen = entry.seen;
        self.persist()?;
        debug!(series = %self.session.series, seen, "progress recorded");
        Ok(true)
    }

    pub fn toggle_pause(&mut self) -> Result<(), WatchError> {
        match self.player.state()? {
            PlayState::Playing => {
                self.player.pause()?;
                self.phase = Phase::Paused;
                self.listener.play_pause_changed(PlayState::Paused);
            }
            PlayState::Paused => {
                self.player.play()?;
                self.phase = Phase::Playing;
                self.listener.play_pause_changed(PlayState::Playing);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn seek_ms(&mut self, position_ms: i64) -> Result<(), WatchError> {
        self.player.seek_ms(position_ms)?;
        self.listener.seeked(position_ms);
        Ok(())
    }

    pub fn volume(&mut self) -> Result<f64, WatchError> {
        Ok(self.player.volume()?)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), WatchError> {
        self.player.set_volume(volume)?;
        self.listener.volume_changed(volume);
        Ok(())
    }

    /// One observation step of the playback state machine.
    pub fn poll(&mut self) -> Result<PollOutcome, WatchError> {
        let state = match self.player.state() {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "player unreachable");
                return Ok(PollOutcome::PlayerGone);
            }
        };

        match state {
            PlayState::Playing => {
                self.phase = Phase::Playing;
                Ok(PollOutcome::Running)
            }
            PlayState::Paused => {
                self.phase = Phase::Paused;
                Ok(PollOutcome::Running)
            }
            PlayState::Ended => {
                if !self.eof_recorded {
                    self.eof_recorded = true;
                    self.record_progress(1.0)?;
                    self.listener.ended();
                }
                Ok(PollOutcome::Ended)
            }
            PlayState::Stopped => {
                if self.phase == Phase::Selecting {
                    Ok(PollOutcome::Running)
                } else {
                    Ok(PollOutcome::PlayerGone)
                }
            }
        }
    }

    /// End the session: evaluate whatever position the player still reports,
    /// record it, stop playback, and persist. Safe to call with a dead
    /// player; the last known `seen` is never lost.
    pub fn shutdown(&mut self) -> Result<(), WatchError> {
        if self.phase == Phase::Stopped {
            return Ok(());
        }
        if !self.eof_recorded
            && let Ok(Some(fraction)) = self.player.position_fraction()
        {
            debug!(fraction, "stopping");
            self.record_progress(fraction)?;
        }
        let _ = self.player.stop();
        self.phase = Phase::Stopped;
        self.listener.ended();
        self.persist()
    }
}
