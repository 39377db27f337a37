pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::CollectionMode;

#[derive(Parser)]
#[command(name = "notecrawl")]
#[command(about = "Scroll-driven note collector", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/notecrawl/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect from a page once and exit
    Run(RunArgs),
    /// Accept JSON control messages on stdin, one per line
    Serve {
        /// Page to open (default: browser.start_url)
        #[arg(short, long)]
        url: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the commented default config file if it doesn't exist
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Page to open (default: browser.start_url)
    #[arg(short, long)]
    pub url: Option<String>,

    /// "profile" or "feed"
    #[arg(short, long)]
    pub mode: Option<CollectionMode>,

    /// Stop after this many items, 0 for no limit
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Items per delivered batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Write batches to this directory
    #[arg(short, long, conflicts_with = "endpoint")]
    pub output: Option<PathBuf>,

    /// POST batches to this URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Save each note's images next to the output
    #[arg(long)]
    pub download_media: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Log file path (default: stdout)
    #[arg(long)]
    pub log: Option<PathBuf>,
}
