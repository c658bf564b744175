//! Drives resolution and comparison over a set of requirements.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    domain::{
        Config, ConfigTree, Outcome, ParameterAddress, Requirement, Status, UnresolvedError,
        Verdict,
    },
    engine::{compare::compare, resolve::resolve_in_order},
};

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// Requirement identifier.
    pub id: String,
    /// Requirement description.
    pub description: String,
    /// Target parameter path, as written.
    pub path: String,
    /// Expected value, as written.
    pub expected: Option<String>,
    /// Configured value(s) the verdict is based on.
    pub actual: Option<String>,
    /// The verdict, or `None` when the requirement could not be evaluated.
    pub verdict: Option<Verdict>,
    /// Pass/fail state.
    pub status: Status,
    /// `source: node path` for every node the address resolved to.
    pub found_in: Vec<String>,
    /// Human-readable explanation.
    pub note: String,
}

/// Row counts per verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Rows with [`Verdict::Matched`].
    pub matched: usize,
    /// Rows with [`Verdict::Mismatched`].
    pub mismatched: usize,
    /// Rows with [`Verdict::NotFound`].
    pub not_found: usize,
    /// Rows with [`Verdict::Ambiguous`].
    pub ambiguous: usize,
    /// Rows with [`Verdict::TypeIncompatible`].
    pub type_incompatible: usize,
    /// Rows that could not be evaluated.
    pub unresolved: usize,
    /// All rows.
    pub total: usize,
}

impl Summary {
    fn record(&mut self, verdict: Option<Verdict>) {
        self.total += 1;
        match verdict {
            Some(Verdict::Matched) => self.matched += 1,
            Some(Verdict::Mismatched) => self.mismatched += 1,
            Some(Verdict::NotFound) => self.not_found += 1,
            Some(Verdict::Ambiguous) => self.ambiguous += 1,
            Some(Verdict::TypeIncompatible) => self.type_incompatible += 1,
            None => self.unresolved += 1,
        }
    }

    /// The number of rows with the given verdict.
    #[must_use]
    pub const fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Matched => self.matched,
            Verdict::Mismatched => self.mismatched,
            Verdict::NotFound => self.not_found,
            Verdict::Ambiguous => self.ambiguous,
            Verdict::TypeIncompatible => self.type_incompatible,
        }
    }

    /// Whether every row matched.
    #[must_use]
    pub const fn all_matched(&self) -> bool {
        self.matched == self.total
    }
}

/// The outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    /// Counts per verdict.
    pub summary: Summary,
    /// One row per requirement, ordered by identifier.
    pub rows: Vec<ReportRow>,
    /// The settled requirements, in row order.
    #[serde(skip)]
    pub requirements: Vec<Requirement>,
}

/// Evaluates every requirement against the configuration trees.
///
/// `trees` are in priority order. Requirements are sorted by identifier
/// (stably, so duplicates keep their input order) and each is settled once.
/// Faulty requirements produce an unresolved row; the run never aborts.
#[instrument(level = "debug", skip_all, fields(requirements = requirements.len(), trees = trees.len()))]
#[must_use]
pub fn run(mut requirements: Vec<Requirement>, trees: &[ConfigTree], config: &Config) -> ReportResult {
    requirements.sort_by(|a, b| a.id().cmp(b.id()));

    let mut seen = HashSet::with_capacity(requirements.len());
    let mut summary = Summary::default();
    let mut rows = Vec::with_capacity(requirements.len());

    for requirement in &mut requirements {
        let (outcome, found_in) = evaluate(requirement, &mut seen, trees, config);

        let row = match requirement.settle(outcome.clone()) {
            Ok(()) => row(requirement, &outcome, found_in),
            Err(e) => {
                warn!(id = requirement.id(), "{e}");
                // The row reports the outcome the requirement keeps.
                let kept = requirement
                    .outcome()
                    .cloned()
                    .unwrap_or_else(|| Outcome::Unresolved(e.clone()));
                let mut row = row(requirement, &kept, Vec::new());
                row.note = format!("{} (not evaluated again: {e})", row.note);
                row
            }
        };

        debug!(id = requirement.id(), verdict = ?row.verdict, "evaluated");
        summary.record(row.verdict);
        rows.push(row);
    }

    ReportResult {
        summary,
        rows,
        requirements,
    }
}

fn evaluate(
    requirement: &Requirement,
    seen: &mut HashSet<String>,
    trees: &[ConfigTree],
    config: &Config,
) -> (Outcome, Vec<String>) {
    let unresolved = |e: UnresolvedError| (Outcome::Unresolved(e), Vec::new());

    if requirement.id().trim().is_empty() {
        return unresolved(UnresolvedError::MissingField("id"));
    }
    if !seen.insert(requirement.id().to_string()) {
        return unresolved(UnresolvedError::DuplicateId);
    }
    if let Some(defect) = requirement.defect() {
        return unresolved(defect.clone());
    }
    if requirement.path().trim().is_empty() {
        return unresolved(UnresolvedError::MissingField("path"));
    }

    let address: ParameterAddress = match requirement.path().parse() {
        Ok(address) => address,
        Err(e) => return unresolved(UnresolvedError::Address(e)),
    };

    let resolved = resolve_in_order(trees, &address, config.cross_file);
    let found_in = resolved
        .iter()
        .map(|node| format!("{}: {}", node.tree().source(), node.path()))
        .collect();

    (
        Outcome::Compared(compare(&resolved, requirement, config)),
        found_in,
    )
}

fn row(requirement: &Requirement, outcome: &Outcome, found_in: Vec<String>) -> ReportRow {
    ReportRow {
        id: requirement.id().to_string(),
        description: requirement.description().to_string(),
        path: requirement.path().to_string(),
        expected: requirement.expected().map(ToString::to_string),
        actual: outcome.actual().map(str::to_string),
        verdict: outcome.verdict(),
        status: outcome.status(),
        found_in,
        note: note(outcome),
    }
}

fn note(outcome: &Outcome) -> String {
    let comparison = match outcome {
        Outcome::Compared(comparison) => comparison,
        Outcome::Unresolved(e) => return format!("Could not be evaluated: {e}"),
    };

    let summary = match comparison.verdict {
        Verdict::Matched if comparison.actual.is_none() => {
            return "Absent from config as required".to_string();
        }
        Verdict::Matched => "Found in config and value is matching.",
        Verdict::NotFound => "Not found in config",
        Verdict::Ambiguous => "Multiple different values in config",
        Verdict::TypeIncompatible => "Value in config could not be compared",
        Verdict::Mismatched => "Values available in config but don't match",
    };

    match &comparison.detail {
        Some(detail) => format!("{summary} ({detail})"),
        None => summary.to_string(),
    }
}
