use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::SeedProfile;
use crate::filesystem::ExtensionAllowList;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub seed: SeedSource,
    pub container_seed: SeedProfile,
    pub allow_list: ExtensionAllowList,
    pub state: Option<PathBuf>,
    /// Lines to run non-interactively; empty means read stdin
    pub commands: Vec<String>,
}

/// Where the host tree comes from when no saved state exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    Builtin(SeedProfile),
    File(PathBuf),
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        let seed = match cli.seed_file {
            Some(path) => SeedSource::File(path),
            None => SeedSource::Builtin(cli.seed),
        };
        let allow_list = if cli.allowed_extensions.is_empty() {
            ExtensionAllowList::default()
        } else {
            ExtensionAllowList::new(&cli.allowed_extensions)
        };

        Self {
            seed,
            container_seed: cli.container_seed,
            allow_list,
            state: cli.state,
            commands: cli.commands,
        }
    }
}
