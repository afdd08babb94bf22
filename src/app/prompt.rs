use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::app::player::TrackInfo;
use crate::app::reconcile::{DirectoryClassifier, DirectoryDecision};
use crate::app::session::{PickEntry, SelectionChoice, SelectionPrompt, TrackPrompt};
use crate::error::WatchError;

/// Line-based stdin prompts implementing every decision interface the
/// engine consumes. All parsing of raw input lives here.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_line(&self, label: &str) -> Result<String, WatchError> {
        print!("{label}");
        io::stdout().flush().map_err(WatchError::Prompt)?;
        prompt_line(&mut io::stdin().lock())
    }

    fn read_track_id(&self, label: &str, tracks: &[TrackInfo]) -> Result<i64, WatchError> {
        if tracks.is_empty() {
            // id 0 disables the stream in mpv terms.
            return Ok(0);
        }
        loop {
            for track in tracks {
                println!("  {}: {}", track.id, track.label);
            }
            let raw = self.read_line(label)?;
            match raw.parse::<i64>() {
                Ok(id) if tracks.iter().any(|track| track.id == id) => return Ok(id),
                _ => println!("Pick one of the listed track ids."),
            }
        }
    }

    /// First-run setup: ask where the series directories live.
    pub fn base_dir(&self) -> Result<PathBuf, WatchError> {
        loop {
            let raw = self.read_line("Select a base directory: ")?;
            if raw.is_empty() {
                continue;
            }
            let path = PathBuf::from(raw);
            if path.is_dir() {
                return Ok(path);
            }
            println!("Not a directory: {}", path.display());
        }
    }
}

/// Read one answer line. Exhausted input is an error, not an empty answer:
/// every prompt loops until it gets a usable reply, and on a closed stdin
/// that loop would otherwise never end.
fn prompt_line(input: &mut impl io::BufRead) -> Result<String, WatchError> {
    let mut line = String::new();
    let read = input.read_line(&mut line).map_err(WatchError::Prompt)?;
    if read == 0 {
        return Err(WatchError::Prompt(io::ErrorKind::UnexpectedEof.into()));
    }
    Ok(line.trim().to_string())
}

impl DirectoryClassifier for TerminalPrompt {
    fn classify(&mut self, path: &Path) -> Result<DirectoryDecision, WatchError> {
        loop {
            let raw = self.read_line(&format!(
                "What to do for {} [Ignore/Add/Recurse]: ",
                path.display()
            ))?;
            match raw.as_str() {
                "I" | "i" => return Ok(DirectoryDecision::Ignore),
                "R" | "r" => return Ok(DirectoryDecision::Recurse),
                "A" | "a" => {
                    let name = self.read_line("Name: ")?;
                    if name.is_empty() {
                        println!("A series needs a name.");
                        continue;
                    }
                    return Ok(DirectoryDecision::Register(name));
                }
                _ => {}
            }
        }
    }

    fn name_taken(&mut self, name: &str) {
        println!("A series named {name:?} already exists; pick another name.");
    }
}

impl SelectionPrompt for TerminalPrompt {
    fn choose(
        &mut self,
        picks: &[PickEntry],
        default: Option<&str>,
    ) -> Result<SelectionChoice, WatchError> {
        println!("Series:");
        for (i, pick) in picks.iter().enumerate() {
            println!(
                "  {}: {} - E{} of {}",
                i + 1,
                pick.name,
                pick.seen + 1,
                pick.episode_count()
            );
        }

        loop {
            let raw = self.read_line(&format!(
                "Which one to watch next? [{}]: ",
                default.unwrap_or("-")
            ))?;
            if raw.is_empty() {
                return Ok(SelectionChoice::UseDefault);
            }
            match raw.parse::<i64>() {
                Ok(index) => return Ok(SelectionChoice::Index(index)),
                Err(_) => println!("Enter a number from the list, or nothing for the default."),
            }
        }
    }
}

impl TrackPrompt for TerminalPrompt {
    fn choose_tracks(
        &mut self,
        audio: &[TrackInfo],
        subtitles: &[TrackInfo],
    ) -> Result<(i64, i64), WatchError> {
        let audio_id = self.read_track_id("Audio track: ", audio)?;
        let subtitle_id = self.read_track_id("Subtitle track: ", subtitles)?;
        Ok((audio_id, subtitle_id))
    }
}
