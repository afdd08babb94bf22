use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "watchnext",
    version,
    about = "Track watch progress across a local library and resume the next episode in mpv"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile the library, pick a series, and start playback (default)
    Watch,
    /// Print every registered series with its progress
    List,
    /// Reconcile the library against the filesystem without playing anything
    Scan,
}
