//! Command line arguments.

use std::path::PathBuf;

use audiotools_core::{DEFAULT_CONFIG_FILE, ErrorPolicy, ExecutionOptions};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The config file to use
    #[arg(short, long, env = "AUDIOTOOLS_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Log key sets and every task
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Announce copies, deletions and writes without performing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Attempt every task in a phase and report all failures
    #[arg(short, long, global = true)]
    pub keep_going: bool,

    /// Also write JSON logs to this directory
    #[arg(long, env = "AUDIOTOOLS_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Make the destination hold exactly the files listed in the playlist
    #[command(alias = "syncPlaylist")]
    SyncPlaylist,

    /// Rewrite playlists as percent-encoded m3u8 for another machine
    #[command(alias = "convertPlaylist")]
    ConvertPlaylist,
}

impl Args {
    /// Execution options for the core library.
    pub const fn execution_options(&self) -> ExecutionOptions {
        let error_policy = if self.keep_going {
            ErrorPolicy::CollectAll
        } else {
            ErrorPolicy::AbortOnFirst
        };
        ExecutionOptions {
            verbose: self.verbose,
            dry_run: self.dry_run,
            error_policy,
        }
    }
}
