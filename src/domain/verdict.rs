use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::address;

/// The classified outcome of comparing a requirement against configuration
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// The configured value is equivalent to the expected value (or the
    /// parameter is absent, as required).
    Matched,
    /// A value was found but it differs from the expected value.
    Mismatched,
    /// No configuration node matches the address.
    NotFound,
    /// Several nodes match and no selection rule picks one.
    Ambiguous,
    /// The configured and expected values cannot be coerced to a common type.
    TypeIncompatible,
}

impl Verdict {
    /// Every verdict, in reporting order.
    pub const ALL: [Self; 5] = [
        Self::Matched,
        Self::NotFound,
        Self::Ambiguous,
        Self::TypeIncompatible,
        Self::Mismatched,
    ];
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Self::Matched => "matched",
            Self::Mismatched => "mismatched",
            Self::NotFound => "not found",
            Self::Ambiguous => "ambiguous",
            Self::TypeIncompatible => "type incompatible",
        };
        f.write_str(label)
    }
}

/// What the comparator concluded for one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// The verdict.
    pub verdict: Verdict,
    /// The configured value(s) the verdict is based on, if any were found.
    pub actual: Option<String>,
    /// Extra context for the human-readable note.
    pub detail: Option<String>,
}

impl Comparison {
    /// A comparison with no actual value and no detail.
    #[must_use]
    pub const fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            actual: None,
            detail: None,
        }
    }

    /// Attaches the configured value.
    #[must_use]
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Attaches extra context.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Pass/fail state of a requirement, as persisted in the requirements record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not evaluated, or could not be evaluated.
    #[default]
    Unresolved,
    /// The configuration satisfies the requirement.
    Pass,
    /// The configuration needs follow-up.
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Self::Unresolved => "unresolved",
            Self::Pass => "pass",
            Self::Fail => "fail",
        };
        f.write_str(label)
    }
}

/// A fault that prevents a requirement from being evaluated.
///
/// These are attached to the requirement's report row; they never abort a
/// run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnresolvedError {
    /// The target path could not be parsed.
    #[error("malformed parameter address: {0}")]
    Address(#[from] address::Error),

    /// A mandatory field is empty.
    #[error("missing mandatory field '{0}'")]
    MissingField(&'static str),

    /// Another requirement with the same identifier was evaluated first.
    #[error("duplicate requirement identifier")]
    DuplicateId,

    /// The requirement already carries an outcome from this run.
    #[error("requirement was already evaluated")]
    AlreadySettled,

    /// A free-text requirement statement could not be understood.
    #[error("could not extract a parameter from statement '{0}'")]
    Statement(String),
}

/// The single outcome recorded on a requirement after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The requirement was compared against the configuration.
    Compared(Comparison),
    /// The requirement could not be evaluated.
    Unresolved(UnresolvedError),
}

impl Outcome {
    /// The verdict, if the requirement was compared.
    #[must_use]
    pub const fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Compared(comparison) => Some(comparison.verdict),
            Self::Unresolved(_) => None,
        }
    }

    /// The status this outcome implies.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self.verdict() {
            Some(Verdict::Matched) => Status::Pass,
            Some(_) => Status::Fail,
            None => Status::Unresolved,
        }
    }

    /// The configured value the outcome is based on.
    #[must_use]
    pub fn actual(&self) -> Option<&str> {
        match self {
            Self::Compared(comparison) => comparison.actual.as_deref(),
            Self::Unresolved(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Verdict::Matched, Status::Pass; "matched passes")]
    #[test_case(Verdict::Mismatched, Status::Fail; "mismatched fails")]
    #[test_case(Verdict::NotFound, Status::Fail; "not found fails")]
    #[test_case(Verdict::Ambiguous, Status::Fail; "ambiguous fails")]
    #[test_case(Verdict::TypeIncompatible, Status::Fail; "incompatible fails")]
    fn verdict_implies_status(verdict: Verdict, status: Status) {
        assert_eq!(Outcome::Compared(Comparison::new(verdict)).status(), status);
    }

    #[test]
    fn unresolved_outcome_has_no_verdict() {
        let outcome = Outcome::Unresolved(UnresolvedError::MissingField("path"));
        assert_eq!(outcome.verdict(), None);
        assert_eq!(outcome.status(), Status::Unresolved);
        assert_eq!(outcome.actual(), None);
    }

    #[test]
    fn verdicts_serialize_as_kebab_case() {
        let json = serde_json::to_string(&Verdict::TypeIncompatible).unwrap();
        assert_eq!(json, "\"type-incompatible\"");
    }
}
