//! Domain models for parameter checking.
//!
//! This module contains the core data types: requirements, parameter
//! addresses, configuration trees, verdicts and the settings that tune
//! comparison.

/// Parameter address types and parsing.
pub mod address;
pub use address::{Error as AddressError, ParameterAddress, Qualifier, Segment};

mod config;
pub use config::{Config, CrossFilePolicy, DEFAULT_FLOAT_TOLERANCE};

pub mod config_tree;
pub use config_tree::{ConfigNode, ConfigTree, NodeId, TreeBuilder};

/// Requirement domain model.
pub mod requirement;
pub use requirement::{Requirement, SelectionRule};

mod value;
pub use value::{RawValue, ValueKind};

mod verdict;
pub use verdict::{Comparison, Outcome, Status, UnresolvedError, Verdict};
