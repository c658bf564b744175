//! Configuration Parameter Checking
//!
//! Requirements state the value a configuration parameter must have. They are
//! compared against the parameters found in a set of configuration files
//! (YAML, JSON, TOML or AUTOSAR ARXML) and every requirement receives a
//! verdict.

pub mod domain;
pub use domain::{
    Config, ConfigTree, CrossFilePolicy, ParameterAddress, RawValue, Requirement, SelectionRule,
    Status, UnresolvedError, ValueKind, Verdict,
};

/// Resolution, normalization and comparison.
pub mod engine;
pub use engine::{ReportResult, ReportRow, Summary, run};

/// Filesystem sources, requirement records and rendered reports.
pub mod storage;
pub use storage::{MarkdownReport, RequirementRecord, load_trees};
