//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod discover;
mod info;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vidscout::config::load_settings;

#[derive(Parser)]
#[command(name = "vidscout")]
#[command(about = "Find video URLs on web pages and download media")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/vidscout/config.toml)
    #[arg(long, global = true, env = "VIDSCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind: PORT, HOST, or HOST:PORT
        #[arg(default_value = "127.0.0.1:4000")]
        bind: String,
    },

    /// Discover video URLs on a page and print them as JSON
    Discover {
        /// Page URL
        url: String,
        /// Skip the headless browser and only inspect the static page
        #[arg(long)]
        no_dynamic: bool,
        /// Overall time budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Show title, duration and available formats for a media URL
    Info {
        /// Media page URL
        url: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::Discover {
            url,
            no_dynamic,
            timeout_ms,
        } => discover::cmd_discover(&settings, &url, no_dynamic, timeout_ms).await,
        Commands::Info { url } => info::cmd_info(&settings, &url).await,
    }
}
