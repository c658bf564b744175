use std::fmt;

use serde::{Deserialize, Serialize};

/// A value as written in a configuration file or a requirements record,
/// before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A single textual value.
    Scalar(String),
    /// A sequence of textual values.
    List(Vec<String>),
}

impl RawValue {
    /// Creates a scalar value.
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Creates a list value.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// Whether the value is a scalar consisting only of whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Scalar(s) if s.trim().is_empty())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Scalar(value) => f.write_str(value),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

/// The kind a requirement declares for its expected value.
///
/// When no kind is declared it is inferred from the values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Integer, hexadecimal or floating point number.
    Number,
    /// `true/false`, `1/0`, `yes/no`, `enabled/disabled`, `on/off`.
    Boolean,
    /// Free text.
    Text,
    /// A symbolic enumerator, compared case-insensitively.
    Enum,
    /// A list of values.
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Enum => "enum",
            Self::List => "list",
        };
        f.write_str(name)
    }
}
