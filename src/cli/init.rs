use std::path::Path;

use parcheck::{Config, CrossFilePolicy};
use tracing::instrument;

/// Arguments of the `init` subcommand.
#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Configuration files to search first, in priority order
    #[arg(long, value_name = "FILE", num_args = 1..)]
    prioritise: Vec<String>,

    /// Collect matches from every configuration file instead of stopping at
    /// the first file that has one
    #[arg(long)]
    merge: bool,
}

impl Command {
    /// Writes a settings file to `settings`, refusing to overwrite one.
    #[instrument]
    pub fn run(self, settings: &Path) -> anyhow::Result<()> {
        if settings.exists() {
            anyhow::bail!(
                "Settings file already exists: {}",
                settings.display()
            );
        }

        let mut config = Config::default();
        if self.merge {
            config.cross_file = CrossFilePolicy::Merge;
        }
        for source in self.prioritise {
            if !config.prioritise_source(source.clone()) {
                tracing::warn!("'{source}' listed more than once");
            }
        }

        config
            .save(settings)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", settings.display()))?;

        println!("Created settings file {}", settings.display());
        if !config.source_order().is_empty() {
            println!("  Source priority: {}", config.source_order().join(", "));
        }
        println!();
        println!("Next steps:");
        println!("  parcheck check --config <DIR> --requirements <FILE>");

        Ok(())
    }
}
