use std::path::{Path, PathBuf};

mod check;
mod init;
mod resolve;
mod terminal;

use check::Check;
use clap::ArgAction;
use parcheck::Config;
use resolve::Resolve;

/// Command line arguments.
#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The settings file controlling resolution and comparison
    #[arg(short, long, default_value = "parcheck.toml", global = true)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Sets up logging and runs the selected subcommand.
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(&self.settings)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// The available subcommands.
#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Check every requirement against the configuration
    ///
    /// Writes report.md, report.json and an annotated copy of the
    /// requirements record to the output directory. Exits with code 2 if any
    /// requirement is not matched.
    Check(Check),

    /// Show the configuration nodes an address resolves to
    Resolve(Resolve),

    /// Write a settings file with default values
    Init(init::Command),
}

impl Command {
    fn run(self, settings: &Path) -> anyhow::Result<()> {
        match self {
            Self::Check(command) => command.run(&load_settings(settings)?)?,
            Self::Resolve(command) => command.run(&load_settings(settings)?)?,
            Self::Init(command) => command.run(settings)?,
        }
        Ok(())
    }
}

/// Loads the settings file, falling back to defaults if there is none.
fn load_settings(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(path).map_err(|e| anyhow::anyhow!("{e} ({})", path.display()))
}
