//! The comparison engine.
//!
//! [`run`] resolves each requirement's address against the configuration
//! trees, normalizes both sides and classifies the result. It performs no
//! I/O; loading trees and requirements is done by [`crate::storage`].

mod compare;
pub use compare::compare;

mod normalize;
pub use normalize::{NormalizeError, NormalizedValue, Number, TypeMismatch, equivalent, normalize};

mod report;
pub use report::{ReportResult, ReportRow, Summary, run};

mod resolve;
pub use resolve::{resolve, resolve_in_order};
