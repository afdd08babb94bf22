mod library;
pub mod player;
mod process;
mod prompt;
mod reconcile;
mod remote;
mod session;


use std::io::{self, BufRead};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cli::{Cli, Command};
use crate::error::WatchError;
use crate::paths::state_file_path;
use crate::registry::Registry;

use self::player::mpv::MpvPlayer;
use self::process::with_sigint_ignored;
use self::prompt::TerminalPrompt;
use self::reconcile::{DirectoryClassifier, reconcile};
use self::remote::LogListener;
use self::session::{PollOutcome, SelectionPrompt, SessionController, pick_list, resolve};

const POLL_PERIOD: Duration = Duration::from_millis(500);

pub fn run(cli: Cli) -> Result<()> {
    let state_path = state_file_path()?;
    let mut prompt = TerminalPrompt;
    let mut registry = open_registry(&state_path, &prompt)?;

    match cli.command {
        Some(Command::List) => run_list(&registry)?,
        Some(Command::Scan) => run_scan(&mut registry, &state_path, &mut prompt)?,
        Some(Command::Watch) | None => run_watch(registry, &state_path, prompt)?,
    }

    Ok(())
}

/// Load the registry, or initialize a fresh one on first run (the only time
/// the user is asked for the base directory).
fn open_registry(state_path: &Path, prompt: &TerminalPrompt) -> Result<Registry> {
    if let Some(registry) = Registry::load(state_path)? {
        return Ok(registry);
    }

    println!("Generating new state file...");
    let base_dir = prompt.base_dir()?;
    let registry = Registry::new(base_dir);
    registry
        .save(state_path)
        .context("failed to initialize state file")?;
    Ok(registry)
}

fn run_list(registry: &Registry) -> Result<()> {
    if registry.series.is_empty() {
        println!("No series registered yet. Run `watchnext scan` first.");
        return Ok(());
    }

    println!("{:<40} {:>6} {:>6}", "SERIES", "SEEN", "TOTAL");
    for (name, entry) in &registry.series {
        let (total, done) = match library::episode_files(&entry.path) {
            Ok(episodes) => (episodes.len().to_string(), entry.seen >= episodes.len()),
            Err(_) => ("?".to_string(), false),
        };
        let marker = if done { "  done" } else { "" };
        println!("{:<40} {:>6} {:>6}{marker}", name, entry.seen, total);
    }
    Ok(())
}

fn run_scan(
    registry: &mut Registry,
    state_path: &Path,
    prompt: &mut TerminalPrompt,
) -> Result<()> {
    let report = reconcile_and_save(registry, state_path, prompt)?;
    if report.is_empty() {
        println!("Library is up to date.");
    } else {
        println!(
            "Registered {} series, ignoring {} directories.",
            report.registered, report.ignored
        );
    }
    Ok(())
}

fn reconcile_and_save(
    registry: &mut Registry,
    state_path: &Path,
    classifier: &mut dyn DirectoryClassifier,
) -> Result<reconcile::ReconcileReport> {
    let report = match reconcile(registry, classifier) {
        Ok(report) => report,
        Err(err) => {
            // Keep whatever the user already decided this run.
            if let Err(save_err) = registry.save(state_path) {
                warn!(error = %save_err, "could not save partial reconciliation");
            }
            return Err(err.into());
        }
    };
    registry.save(state_path)?;
    Ok(report)
}

/// Commands a remote surface may feed back into the engine. Here they come
/// from a stdin reader thread; the engine thread stays the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCommand {
    Next,
    Previous,
    PlayPause,
    Quit,
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    match line.trim() {
        "n" | "next" => Some(SessionCommand::Next),
        "p" | "prev" | "previous" => Some(SessionCommand::Previous),
        "" | "space" | "pause" => Some(SessionCommand::PlayPause),
        "q" | "quit" => Some(SessionCommand::Quit),
        _ => None,
    }
}

fn run_watch(mut registry: Registry, state_path: &Path, mut prompt: TerminalPrompt) -> Result<()> {
    reconcile_and_save(&mut registry, state_path, &mut prompt)?;

    let picks = pick_list(&registry);
    if picks.is_empty() {
        println!("Nothing left to watch; every registered series is fully seen.");
        return Ok(());
    }

    // Selection errors re-prompt, they never end the run.
    let session = loop {
        let default = registry.previous.clone();
        let choice = prompt.choose(&picks, default.as_deref())?;
        match resolve(&mut registry, &picks, choice) {
            Ok(session) => break session,
            Err(err) if err.is_recoverable() => println!("{err}"),
            Err(err) => return Err(err.into()),
        }
    };
    registry.save(state_path)?;

    let player = MpvPlayer::spawn().context("failed to start mpv")?;
    let mut controller = SessionController::new(
        registry,
        state_path.to_path_buf(),
        session,
        player,
        LogListener,
    );

    println!("Controls: [n]ext, [p]revious, [enter] play/pause, [q]uit.");
    let result = with_sigint_ignored(|| watch_loop(&mut controller, &mut prompt));
    // Whatever happened above, the session winds down through the same path
    // so the last known progress reaches the state file.
    controller.shutdown()?;
    result
}

fn watch_loop(
    controller: &mut SessionController<MpvPlayer, LogListener>,
    prompt: &mut TerminalPrompt,
) -> Result<()> {
    controller.start(prompt)?;

    let commands = spawn_stdin_reader();
    loop {
        match commands.recv_timeout(POLL_PERIOD) {
            Ok(SessionCommand::Next) => {
                if let Err(err) = controller.advance() {
                    report_navigation(err)?;
                }
            }
            Ok(SessionCommand::Previous) => {
                if let Err(err) = controller.retreat() {
                    report_navigation(err)?;
                }
            }
            Ok(SessionCommand::PlayPause) => controller.toggle_pause()?,
            Ok(SessionCommand::Quit) => return Ok(()),
            Err(mpsc::RecvTimeoutError::Timeout) => match controller.poll()? {
                PollOutcome::Running | PollOutcome::Ended => {}
                PollOutcome::PlayerGone => {
                    debug!("player went away, ending session");
                    return Ok(());
                }
            },
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // stdin closed; keep following the player until it exits.
                match controller.poll()? {
                    PollOutcome::PlayerGone => return Ok(()),
                    _ => thread::sleep(POLL_PERIOD),
                }
            }
        }
    }
}

fn report_navigation(err: WatchError) -> Result<()> {
    if err.is_recoverable() {
        println!("{err}");
        return Ok(());
    }
    Err(err.into())
}

fn spawn_stdin_reader() -> mpsc::Receiver<SessionCommand> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(command) = parse_command(&line) {
                let quit = command == SessionCommand::Quit;
                if tx.send(command).is_err() || quit {
                    break;
                }
            }
        }
    });
    rx
}
