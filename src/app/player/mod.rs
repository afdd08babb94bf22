pub mod mpv;

use std::io;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to launch player: {0}")]
    Spawn(#[source] io::Error),

    #[error("player IPC failed: {0}")]
    Ipc(#[source] io::Error),

    #[error("unexpected player response: {0}")]
    Protocol(String),

    #[error("player rejected {command:?}: {reason}")]
    Command { command: String, reason: String },

    #[error("player did not start playing within {0:?}")]
    StartupTimeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
    Ended,
}

/// One selectable audio or subtitle track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: i64,
    pub label: String,
}

/// Everything the engine may ask of a media player, as named operations.
/// There is deliberately no generic command passthrough: a capability the
/// engine needs gets a method here.
pub trait MediaPlayer {
    fn load(&mut self, path: &Path) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn stop(&mut self) -> Result<(), PlayerError>;
    fn seek_ms(&mut self, position_ms: i64) -> Result<(), PlayerError>;

    /// Playback position as a fraction of the duration, in `[0, 1]`.
    /// `None` when no media is loaded or the duration is still unknown.
    fn position_fraction(&mut self) -> Result<Option<f64>, PlayerError>;
    fn duration_ms(&mut self) -> Result<Option<i64>, PlayerError>;
    fn state(&mut self) -> Result<PlayState, PlayerError>;

    fn audio_tracks(&mut self) -> Result<Vec<TrackInfo>, PlayerError>;
    fn subtitle_tracks(&mut self) -> Result<Vec<TrackInfo>, PlayerError>;
    fn select_tracks(&mut self, audio: i64, subtitles: i64) -> Result<(), PlayerError>;

    fn volume(&mut self) -> Result<f64, PlayerError>;
    fn set_volume(&mut self, volume: f64) -> Result<(), PlayerError>;

    /// Block until the player reports `Playing`, failing with
    /// `StartupTimeout` once the deadline passes. Never spins unbounded.
    fn wait_until_playing(&mut self, timeout: Duration) -> Result<(), PlayerError>;
}
