//! discordum - console host for Dynamic Discord UM+.
//!
//! Runs the plugin core next to a game server without the server's plugin
//! API: provisions Node.js, launches the status bot, and accepts `dcum`
//! commands on stdin.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod console;
mod theme;

use commands::{args, provision, run};

/// Dynamic Discord UM+ - Discord status bot for game servers
#[derive(Parser)]
#[command(name = "discordum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Plugin data directory (config.toml, bot.js, node/, node_modules/)
    #[arg(short, long, global = true, env = "DISCORDUM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Operating system name to provision for, instead of the detected one
    #[arg(long, global = true)]
    platform: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enable the plugin and read console commands until `stop`
    Run,

    /// Write default files and install Node.js and dependencies, then exit
    Provision,

    /// Print the command line the bot would be launched with
    Args,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(console::default_data_dir);

    // The [logging] section drives the subscriber; fall back to defaults
    // when the file is missing or broken so the error itself gets logged.
    let mut log_config = discordum_config::Config::load(&data_dir)
        .map(|c| discordum_telemetry::log_config_from(&c.logging))
        .unwrap_or_default();
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = discordum_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
        let _ = discordum_telemetry::setup_default_logging();
    }

    let host = console::ConsoleHost::new(data_dir, cli.platform);
    match cli.command {
        Commands::Run => run::run(host),
        Commands::Provision => provision::run_provision(host),
        Commands::Args => args::print_args(&host),
    }
}
