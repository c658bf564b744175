//! Reading configuration sources and requirement records, and writing
//! reports.

mod arxml;

/// The on-disk requirements record.
pub mod record;
pub use record::{LoadError, RequirementRecord};

mod report;
pub use report::MarkdownReport;

mod sources;
pub use sources::{SOURCE_EXTENSIONS, SourceError, load_trees, tree_from_value};
