use serde::{Deserialize, Serialize};

use crate::domain::{Outcome, RawValue, Status, UnresolvedError, ValueKind};

/// How several resolved nodes are collapsed into the single value that is
/// compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionRule {
    /// Use the first node in resolution order.
    First,
    /// Use the last node in resolution order.
    Last,
    /// All nodes must hold equivalent values; that value is compared.
    AllAgree,
}

/// An expected parameter value plus its target address.
///
/// A requirement is created unresolved when the requirements record is
/// loaded, and is settled exactly once by [`crate::engine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) path: String,
    pub(crate) expected: Option<RawValue>,
    pub(crate) kind: Option<ValueKind>,
    pub(crate) selection: Option<SelectionRule>,
    pub(crate) expect_absent: bool,
    pub(crate) ordered: bool,
    /// A problem detected while reading the record.
    pub(crate) defect: Option<UnresolvedError>,
    pub(crate) outcome: Option<Outcome>,
}

impl Requirement {
    /// Creates an unresolved requirement.
    ///
    /// An `expected` value of `None` (or a blank scalar) means the parameter
    /// must be absent.
    pub fn new(id: impl Into<String>, path: impl Into<String>, expected: Option<RawValue>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            path: path.into(),
            expected,
            kind: None,
            selection: None,
            expect_absent: false,
            ordered: false,
            defect: None,
            outcome: None,
        }
    }

    /// Sets the textual description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares the kind of the expected value.
    #[must_use]
    pub const fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Declares how multiple matches are handled.
    #[must_use]
    pub const fn with_selection(mut self, selection: SelectionRule) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Requires the parameter to be absent, regardless of `expected`.
    #[must_use]
    pub const fn expecting_absence(mut self) -> Self {
        self.expect_absent = true;
        self
    }

    /// Makes list comparison order-significant.
    #[must_use]
    pub const fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Marks the requirement as unusable; it will be reported unresolved.
    #[must_use]
    pub fn with_defect(mut self, defect: UnresolvedError) -> Self {
        self.defect = Some(defect);
        self
    }

    /// The unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The textual description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The target parameter path, as written.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The expected value, as written.
    #[must_use]
    pub const fn expected(&self) -> Option<&RawValue> {
        self.expected.as_ref()
    }

    /// The declared kind, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    /// The declared selection rule, if any.
    #[must_use]
    pub const fn selection(&self) -> Option<SelectionRule> {
        self.selection
    }

    /// Whether list order is significant.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Whether the explicit absence flag is set.
    #[must_use]
    pub const fn is_absence_flagged(&self) -> bool {
        self.expect_absent
    }

    /// Whether the requirement is satisfied only by the parameter being
    /// absent: the absence flag is set, or no value is expected.
    #[must_use]
    pub fn expects_absence(&self) -> bool {
        self.expect_absent || self.expected.as_ref().is_none_or(RawValue::is_blank)
    }

    /// A problem detected while reading the record, if any.
    #[must_use]
    pub const fn defect(&self) -> Option<&UnresolvedError> {
        self.defect.as_ref()
    }

    /// The outcome recorded by the last run.
    #[must_use]
    pub const fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// The pass/fail status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.outcome.as_ref().map_or(Status::Unresolved, Outcome::status)
    }

    /// The configured value the outcome is based on.
    #[must_use]
    pub fn actual(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(Outcome::actual)
    }

    /// Records the outcome of evaluating this requirement.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedError::AlreadySettled`] if an outcome was already
    /// recorded; the existing outcome is kept.
    pub fn settle(&mut self, outcome: Outcome) -> Result<(), UnresolvedError> {
        if self.outcome.is_some() {
            return Err(UnresolvedError::AlreadySettled);
        }
        self.outcome = Some(outcome);
        Ok(())
    }
}
