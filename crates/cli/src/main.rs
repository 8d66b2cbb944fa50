//! Replays scripted storage scenarios against a machine and a synced mirror.
//!
//! Run with: `storage-cli replay crates/cli/data/scenarios/smelting.ron`

mod commands;
mod config;
mod scenario;

use anyhow::Result;
use clap::Parser;
use commands::{Inspect, Replay};
use config::CliConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Storage engine scenario tool
#[derive(Parser)]
#[command(name = "storage-cli")]
#[command(about = "Replay and inspect machine storage scenarios", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Run a scenario, mirroring every sync into a second machine
    Replay(Replay),

    /// Load a saved machine record and print its contents
    Inspect(Inspect),
}

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = CliConfig::from_env();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay(cmd) => cmd.execute(&config),
        Command::Inspect(cmd) => cmd.execute(&config),
    }
}
