use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod status;
pub use status::StatusDisplay;


/// PCM playback engine CLI
#[derive(Debug, Parser)]
#[command(name = "pcmplay")]
#[command(about = "Play uncompressed PCM audio through the portable playback engine")]
#[command(version = "0.1.0")]
pub struct CliApp {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Play a file, optionally from a saved resume point
    Play {
        /// File to play; `.wav` files are decoded, anything else plays as silence
        path: String,
        /// Byte offset to resume from
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Samples already played at the resume point
        #[arg(long, default_value_t = 0)]
        samples: u32,
        /// Volume index (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },
    /// Print the format and duration of a file without playing it
    Probe {
        /// File to inspect
        path: String,
    },
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir.join(rest);
            }
        } else if path == "~" {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir;
            }
        }
        PathBuf::from(path)
    }
}
