//! mpv backend speaking its JSON IPC protocol over a unix socket.
//!
//! mpv is spawned idle with `--input-ipc-server` and every operation is a
//! `{"command": [...], "request_id": n}` envelope; events arriving on the
//! same socket are skipped while waiting for the matching reply.

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::debug;

use super::{MediaPlayer, PlayState, PlayerError, TrackInfo};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct MpvPlayer {
    child: Child,
    socket_path: PathBuf,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    next_request_id: u64,
}

impl MpvPlayer {
    /// Spawn mpv with IPC enabled and connect to its control socket.
    pub fn spawn() -> Result<Self, PlayerError> {
        let socket_path = env::temp_dir().join(format!("watchnext-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let child = Command::new("mpv")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--fullscreen")
            .arg("--keep-open=yes")
            .arg("--no-terminal")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(PlayerError::Spawn)?;

        // On any failure from here the child must not outlive the error:
        // mpv was started idle and would sit in its window forever.
        let stream = match Self::connect(&socket_path, CONNECT_TIMEOUT) {
            Ok(stream) => stream,
            Err(err) => {
                reap(child, &socket_path);
                return Err(err);
            }
        };
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(err) => {
                reap(child, &socket_path);
                return Err(PlayerError::Ipc(err));
            }
        };
        debug!(socket = %socket_path.display(), "connected to mpv");

        Ok(Self {
            child,
            socket_path,
            reader: BufReader::new(stream),
            writer,
            next_request_id: 1,
        })
    }

    fn connect(socket_path: &Path, timeout: Duration) -> Result<UnixStream, PlayerError> {
        let deadline = Instant::now() + timeout;
        loop {
            match UnixStream::connect(socket_path) {
                Ok(stream) => return Ok(stream),
                Err(_) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Err(_) => return Err(PlayerError::StartupTimeout(timeout)),
            }
        }
    }

    /// Send one command and wait for the reply with the matching request id.
    fn command(&mut self, args: &[Value]) -> Result<Value, PlayerError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut envelope = serde_json::to_string(&json!({
            "command": args,
            "request_id": request_id,
        }))
        .map_err(|err| PlayerError::Protocol(err.to_string()))?;
        envelope.push('\n');
        self.writer
            .write_all(envelope.as_bytes())
            .map_err(PlayerError::Ipc)?;

        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).map_err(PlayerError::Ipc)?;
            if read == 0 {
                return Err(PlayerError::Protocol("player closed the socket".to_string()));
            }
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            if message.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                // Async events share the socket; only the matching reply counts.
                continue;
            }

            let error = message
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("reply carried no error field");
            if error == "success" {
                return Ok(message.get("data").cloned().unwrap_or(Value::Null));
            }
            return Err(PlayerError::Command {
                command: args
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_string(),
                reason: error.to_string(),
            });
        }
    }

    /// `None` when mpv reports the property as unavailable (e.g. no media
    /// loaded yet), which is not a failure.
    fn get_property(&mut self, name: &str) -> Result<Option<Value>, PlayerError> {
        match self.command(&[json!("get_property"), json!(name)]) {
            Ok(value) => Ok(Some(value)),
            Err(PlayerError::Command { reason, .. }) if reason == "property unavailable" => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), PlayerError> {
        self.command(&[json!("set_property"), json!(name), value])
            .map(|_| ())
    }

    fn flag_property(&mut self, name: &str) -> Result<bool, PlayerError> {
        Ok(self
            .get_property(name)?
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    fn tracks_of_type(&mut self, track_type: &str) -> Result<Vec<TrackInfo>, PlayerError> {
        let list = self.get_property("track-list")?.unwrap_or(Value::Null);
        let Some(items) = list.as_array() else {
            return Ok(Vec::new());
        };

        let mut tracks = Vec::new();
        for item in items {
            if item.get("type").and_then(Value::as_str) != Some(track_type) {
                continue;
            }
            let Some(id) = item.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let label = item
                .get("title")
                .or_else(|| item.get("lang"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("track {id}"));
            tracks.push(TrackInfo { id, label });
        }
        Ok(tracks)
    }

    fn child_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)) | Err(_))
    }
}

impl MediaPlayer for MpvPlayer {
    fn load(&mut self, path: &Path) -> Result<(), PlayerError> {
        self.command(&[
            json!("loadfile"),
            json!(path.to_string_lossy()),
            json!("replace"),
        ])
        .map(|_| ())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.set_property("pause", json!(false))
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.set_property("pause", json!(true))
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.command(&[json!("stop")]).map(|_| ())
    }

    fn seek_ms(&mut self, position_ms: i64) -> Result<(), PlayerError> {
        self.command(&[
            json!("seek"),
            json!(position_ms as f64 / 1000.0),
            json!("absolute"),
        ])
        .map(|_| ())
    }

    fn position_fraction(&mut self) -> Result<Option<f64>, PlayerError> {
        let percent = self
            .get_property("percent-pos")?
            .and_then(|value| value.as_f64());
        Ok(percent.map(|p| (p / 100.0).clamp(0.0, 1.0)))
    }

    fn duration_ms(&mut self) -> Result<Option<i64>, PlayerError> {
        let seconds = self
            .get_property("duration")?
            .and_then(|value| value.as_f64());
        Ok(seconds.map(|s| (s * 1000.0) as i64))
    }

    fn state(&mut self) -> Result<PlayState, PlayerError> {
        if self.child_exited() {
            return Ok(PlayState::Stopped);
        }
        // keep-open leaves the file loaded and paused at EOF, so check
        // eof-reached before pause.
        if self.flag_property("eof-reached")? {
            return Ok(PlayState::Ended);
        }
        if self.flag_property("idle-active")? {
            return Ok(PlayState::Stopped);
        }
        if self.flag_property("pause")? {
            return Ok(PlayState::Paused);
        }
        Ok(PlayState::Playing)
    }

    fn audio_tracks(&mut self) -> Result<Vec<TrackInfo>, PlayerError> {
        self.tracks_of_type("audio")
    }

    fn subtitle_tracks(&mut self) -> Result<Vec<TrackInfo>, PlayerError> {
        self.tracks_of_type("sub")
    }

    fn select_tracks(&mut self, audio: i64, subtitles: i64) -> Result<(), PlayerError> {
        self.set_property("aid", json!(audio))?;
        self.set_property("sid", json!(subtitles))
    }

    fn volume(&mut self) -> Result<f64, PlayerError> {
        Ok(self
            .get_property("volume")?
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0)
            / 100.0)
    }

    fn set_volume(&mut self, volume: f64) -> Result<(), PlayerError> {
        self.set_property("volume", json!((volume * 100.0).clamp(0.0, 100.0)))
    }

    fn wait_until_playing(&mut self, timeout: Duration) -> Result<(), PlayerError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state()? == PlayState::Playing && !self.flag_property("core-idle")? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PlayerError::StartupTimeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        let _ = self.command(&[json!("quit")]);
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Kill and reap a child whose IPC setup failed, and drop its socket file.
fn reap(mut child: Child, socket_path: &Path) {
    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_file(socket_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn connect_gives_up_when_no_socket_appears() {
        let dir = TempDir::new().unwrap();
        let err = MpvPlayer::connect(&dir.path().join("never.sock"), Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, PlayerError::StartupTimeout(_)));
    }

    #[test]
    fn failed_ipc_setup_leaves_no_child_or_socket_behind() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("mpv.sock");
        std::fs::write(&socket_path, "").unwrap();

        let child = Command::new("sleep")
            .arg("60")
            .stdin(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id() as libc::pid_t;

        reap(child, &socket_path);

        assert!(!socket_path.exists());
        // After kill + wait the pid no longer names a live process.
        assert_eq!(unsafe { libc::kill(pid, 0) }, -1);
    }
}
