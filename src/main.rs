use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fundlens::core::log::init_logging;
use fundlens::{AppCommand, run_command};

#[derive(Parser)]
#[command(name = "fundlens", version, about = "Mutual fund data service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(long, global = true, value_name = "FILE")]
    config_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Sync funds from the provider and exit
    Sync {
        /// Maximum number of funds to sync
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Write a default config file
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Commands::Serve => AppCommand::Serve,
        Commands::Sync { limit } => AppCommand::Sync { limit },
        Commands::Setup => AppCommand::Setup,
    };
    run_command(command, cli.config_path).await
}
