use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Private state directory (overrides the config file)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the configured playlists (default)
    Run {
        /// Run a single scan cycle and exit
        #[arg(long)]
        once: bool,

        /// Never prompt; exit after creating template files on first run
        #[arg(long)]
        no_interactive: bool,
    },

    /// Configure playlists interactively, replacing the current source list
    Setup,

    /// Check that yt-dlp, ffmpeg and vot-cli-live are installed
    Check,

    /// List the videos of a playlist and whether they were already processed
    Scan {
        /// Playlist URL
        locator: String,

        /// Print items as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            once: false,
            no_interactive: false,
        }
    }
}
