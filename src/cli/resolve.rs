use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use parcheck::{Config, CrossFilePolicy, ParameterAddress, engine, load_trees};
use serde::Serialize;
use tracing::instrument;

use super::terminal::Colorize;

/// Arguments of the `resolve` subcommand.
#[derive(Debug, Parser)]
#[command(about = "Show the configuration nodes an address resolves to")]
pub struct Resolve {
    /// The parameter address, e.g. `Can.CanGeneral.CanTimeoutDuration` or
    /// `**.CanTimeoutDuration`
    address: ParameterAddress,

    /// Directory holding the configuration files
    #[arg(short, long, value_name = "DIR")]
    config: PathBuf,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct Match {
    source: String,
    path: String,
    value: Option<String>,
    /// Whether a check would consider this node under the configured
    /// cross-file policy.
    considered: bool,
}

impl Resolve {
    /// Prints every node the address resolves to, per source file.
    #[instrument(level = "debug", skip(self, settings), fields(address = %self.address))]
    pub fn run(self, settings: &Config) -> anyhow::Result<()> {
        let trees = load_trees(&self.config, settings).with_context(|| {
            format!("failed to load configuration from {}", self.config.display())
        })?;

        let considered = engine::resolve_in_order(&trees, &self.address, settings.cross_file);
        let matches: Vec<Match> = trees
            .iter()
            .flat_map(|tree| engine::resolve(tree, &self.address))
            .map(|node| Match {
                source: node.tree().source().to_string(),
                path: node.path(),
                value: node.value().map(ToString::to_string),
                considered: considered.contains(&node),
            })
            .collect();

        match self.output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&matches)
                    .context("failed to render json output")?;
                println!("{json}");
            }
            OutputFormat::Table => self.output_table(&matches, settings.cross_file),
        }
        Ok(())
    }

    fn output_table(&self, matches: &[Match], policy: CrossFilePolicy) {
        if matches.is_empty() {
            println!("No parameter matches '{}'.", self.address);
            return;
        }

        let mut current_source = None;
        for m in matches {
            if current_source != Some(m.source.as_str()) {
                println!("{}", m.source.info());
                current_source = Some(m.source.as_str());
            }
            let value = m
                .value
                .as_deref()
                .map_or_else(|| "<container>".dim(), ToString::to_string);
            let marker = if m.considered { "" } else { " (shadowed)" };
            println!("  {} = {value}{}", m.path, marker.dim());
        }

        if policy == CrossFilePolicy::FirstMatch && matches.iter().any(|m| !m.considered) {
            println!();
            println!(
                "{}",
                "Shadowed nodes are ignored: only the first file with a match is checked.".dim()
            );
        }
    }
}
