//! Command line interface for checking configuration parameters against a
//! requirements record.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
