use tracing::debug;

use super::player::PlayState;

/// Notification seam towards a remote-control surface (an MPRIS bridge, a
/// status bar, ...). Every event is a named method with a no-op default, so
/// an implementation only overrides what it can display.
pub trait PlaybackListener {
    fn title_changed(&mut self, _title: &str) {}
    fn play_pause_changed(&mut self, _state: PlayState) {}
    fn volume_changed(&mut self, _volume: f64) {}
    fn seeked(&mut self, _position_ms: i64) {}
    fn ended(&mut self) {}
}

/// Listener that swallows everything.
#[derive(Debug, Default)]
pub struct NullListener;

impl PlaybackListener for NullListener {}

/// Listener that traces every notification; the default for the CLI, where
/// the only remote surface is the log.
#[derive(Debug, Default)]
pub struct LogListener;

impl PlaybackListener for LogListener {
    fn title_changed(&mut self, title: &str) {
        debug!(title, "now playing");
    }

    fn play_pause_changed(&mut self, state: PlayState) {
        debug!(?state, "playback state changed");
    }

    fn volume_changed(&mut self, volume: f64) {
        debug!(volume, "volume changed");
    }

    fn seeked(&mut self, position_ms: i64) {
        debug!(position_ms, "seeked");
    }

    fn ended(&mut self) {
        debug!("end of media");
    }
}
