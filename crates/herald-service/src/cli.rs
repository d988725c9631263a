//! Command-line interface definition using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Herald - runs configured tasks and reports their results
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the settings file
    #[arg(short, long, env = "HERALD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep results in memory and log notifications instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run scheduled tasks and listen for Telegram commands (default)
    Serve,

    /// Run one task command and wait for it
    Run {
        /// Task ID
        #[arg(required = true)]
        task: String,

        /// Command ID
        #[arg(required = true)]
        command: String,
    },

    /// List registered tasks and their commands
    Tasks,
}

impl Cli {
    /// Tracing filter for the verbosity flag.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "herald=info,herald_service=info,herald_core=info,teloxide=warn",
            1 => "herald=debug,herald_service=debug,herald_core=debug,herald_persistence=debug,herald_telegram=debug,teloxide=info",
            2 => "herald=trace,herald_service=trace,herald_core=trace,herald_persistence=trace,herald_telegram=trace,teloxide=debug",
            _ => "trace",
        }
    }
}
