use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audioshelf")]
#[command(about = "Scan audiobook folders into a local catalog and keep track of where you are")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of ~/.config/audioshelf/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog directory (overrides config)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tag decoder pipe (overrides config)
    #[arg(long, global = true)]
    pub fifo: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory and merge the audiobooks found into the catalog
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },

    /// List audiobooks in the catalog
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Show an author/title tree
        #[arg(long, conflicts_with = "json")]
        tree: bool,
    },

    /// Show one audiobook with its chapters and saved position
    Show {
        author: String,
        title: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an audiobook from the catalog
    Remove { author: String, title: String },

    /// Move an audiobook to a new author and title
    Rename {
        author: String,
        title: String,
        new_author: String,
        new_title: String,
    },

    /// Move the saved playback position of an audiobook
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .args(["by", "fraction", "track", "next", "previous", "resume"]),
    ))]
    Seek {
        author: String,
        title: String,

        /// Relative jump in milliseconds (negative goes back)
        #[arg(long, allow_hyphen_values = true)]
        by: Option<i64>,

        /// Jump to a fraction (0.0 to 1.0) of the current track
        #[arg(long)]
        fraction: Option<f64>,

        /// Jump to the start of a track (1-based)
        #[arg(long)]
        track: Option<usize>,

        /// Jump to the start of the next track
        #[arg(long)]
        next: bool,

        /// Jump to the start of the previous track
        #[arg(long)]
        previous: bool,

        /// Rewind a little after a pause of this many seconds
        #[arg(long, value_name = "SECS")]
        resume: Option<u64>,
    },

    /// Delete the whole catalog
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}
