use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::Context;
use clap::Parser;
use parcheck::{
    Config, MarkdownReport, ReportResult, ReportRow, RequirementRecord, Summary, Verdict,
    load_trees,
};
use tracing::{info, instrument};

use super::terminal::{Colorize, is_narrow};

/// Arguments of the `check` subcommand.
#[derive(Debug, Parser)]
#[command(about = "Compare configuration parameters with a requirements record")]
pub struct Check {
    /// Directory holding the configuration files
    #[arg(short, long, value_name = "DIR")]
    config: PathBuf,

    /// The requirements record (yaml, json or toml)
    #[arg(short, long, value_name = "FILE")]
    requirements: PathBuf,

    /// Directory the reports and the annotated record are written to
    #[arg(short, long, value_name = "DIR", default_value = "_out")]
    output_dir: PathBuf,

    /// Output format (table, json, quiet)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

impl Check {
    /// Runs the check, writes the reports and prints the outcome.
    ///
    /// Exits the process with code 2 unless every requirement matched.
    #[instrument(level = "debug", skip(self, settings))]
    pub fn run(self, settings: &Config) -> anyhow::Result<()> {
        let mut record = RequirementRecord::load(&self.requirements).with_context(|| {
            format!(
                "failed to load requirements from {}",
                self.requirements.display()
            )
        })?;
        let trees = load_trees(&self.config, settings).with_context(|| {
            format!("failed to load configuration from {}", self.config.display())
        })?;
        info!(
            "Checking {} requirements against {} configuration files",
            record.len(),
            trees.len()
        );

        let result = parcheck::run(record.requirements(), &trees, settings);
        record.annotate(&result);
        self.write_outputs(&record, &result)?;

        match self.output {
            OutputFormat::Table => self.output_table(&result),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&result)
                    .context("failed to render json output")?;
                println!("{json}");
            }
            OutputFormat::Quiet => Self::output_quiet(&result.summary),
        }

        // Anything short of a full match needs follow-up.
        if !result.summary.all_matched() {
            process::exit(2);
        }

        Ok(())
    }

    fn write_outputs(&self, record: &RequirementRecord, result: &ReportResult) -> anyhow::Result<()> {
        let dir = &self.output_dir;
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        write(&dir.join("report.md"), &MarkdownReport(result).to_string())?;
        let json = serde_json::to_string_pretty(result).context("failed to render report.json")?;
        write(&dir.join("report.json"), &json)?;

        let file_name = self
            .requirements
            .file_name()
            .context("requirements path has no file name")?;
        let updated = dir.join(file_name);
        record
            .save(&updated)
            .with_context(|| format!("failed to write {}", updated.display()))?;
        info!("Reports written to {}", dir.display());
        Ok(())
    }

    fn output_table(&self, result: &ReportResult) {
        let summary = &result.summary;
        if summary.total == 0 {
            println!("No requirements found in {}.", self.requirements.display());
            return;
        }

        println!("Parameter check");
        println!("{}", "───────────────".dim());

        let narrow = is_narrow();
        for row in &result.rows {
            let label = format!("{:<17}", verdict_label(row)).by_verdict(row.verdict);
            if narrow {
                println!("{} {label}", row.id);
                println!("  {}", row.path.dim());
            } else {
                println!("{:<12} {label} {}", row.id, row.path);
            }
        }

        println!();
        for verdict in Verdict::ALL {
            println!("{:<18}{}", verdict.to_string(), summary.count(verdict));
        }
        println!("{:<18}{}", "unresolved", summary.unresolved);
        println!("{:<18}{}", "total", summary.total);
        println!();

        if summary.all_matched() {
            println!("All parameters match ✅");
        } else {
            let follow_up = summary.total - summary.matched;
            println!(
                "{} of {} requirements need follow-up ⚠️",
                follow_up.to_string().warning(),
                summary.total
            );
            let report = self.output_dir.join("report.md");
            println!("{}", format!("See {} for details.", report.display()).dim());
        }
    }

    fn output_quiet(summary: &Summary) {
        println!(
            "matched={} mismatched={} not_found={} ambiguous={} type_incompatible={} unresolved={} total={}",
            summary.matched,
            summary.mismatched,
            summary.not_found,
            summary.ambiguous,
            summary.type_incompatible,
            summary.unresolved,
            summary.total
        );
    }
}

fn verdict_label(row: &ReportRow) -> String {
    row.verdict
        .map_or_else(|| "unresolved".to_string(), |verdict| verdict.to_string())
}

fn write(path: &Path, content: &str) -> anyhow::Result<()> {
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
