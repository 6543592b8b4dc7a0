use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::config::SeedProfile;

/// Interactive shell over an in-memory filesystem.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Built-in layout of the host tree
    #[clap(long, default_value = "host", value_enum)]
    pub seed: SeedProfile,

    /// YAML seed file for the host tree, overrides --seed
    #[clap(long)]
    pub seed_file: Option<PathBuf>,

    /// Built-in layout used for every context opened with `enter`
    #[clap(long, default_value = "debian", value_enum)]
    pub container_seed: SeedProfile,

    /// Allowed file extension, may be repeated (defaults to yaml, yml, json, kyaml)
    #[clap(long = "allow-ext", value_name = "EXT")]
    pub allowed_extensions: Vec<String>,

    /// File the host tree is loaded from at start and saved to on exit
    #[clap(long)]
    pub state: Option<PathBuf>,

    /// Run this line instead of reading from stdin, may be repeated
    #[clap(long = "command", short = 'c', value_name = "LINE")]
    pub commands: Vec<String>,
}
