mod cli;
mod commands;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use transit_tile_lib::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Command::Generate { output, cache_dir } => commands::generate(config, output, cache_dir),
        Command::Backfill { output } => commands::backfill(config, output),
    }
}
