use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Transit Tiler - Render transit route maps into a pyramid of PNG tiles
pub struct Cli {
    /// JSON configuration file
    #[clap(short, long, value_name = "FILE", default_value = "config.json", global = true)]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load the configured feeds and render every non-empty tile
    Generate {
        /// Output directory, overriding `output.directory`
        #[clap(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Feed cache directory, overriding `cacheDirectory`
        #[clap(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,
    },

    /// Write transparent tiles for every missing tile inside the configured bounds
    Backfill {
        /// Output directory, overriding `output.directory`
        #[clap(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
}
