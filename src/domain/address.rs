use std::{fmt, str::FromStr};

use non_empty_string::NonEmptyString;
use nonempty::NonEmpty;

/// A qualifier narrowing the children matched by a named segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    /// Zero-based position among the same-named children of one parent.
    Index(usize),
    /// Only children that have a direct child `key` holding the scalar
    /// `value`.
    Field {
        /// Name of the child that carries the discriminating value.
        key: NonEmptyString,
        /// The scalar value the child must hold (compared after trimming).
        value: String,
    },
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Field { key, value } => write!(f, "[{key}={value}]"),
        }
    }
}

/// One step of a [`ParameterAddress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Children with the given name, optionally narrowed by a qualifier.
    Named {
        /// The child name to match.
        name: NonEmptyString,
        /// An optional selector applied to the matching children.
        qualifier: Option<Qualifier>,
    },
    /// Any direct child (`*`).
    AnyChild,
    /// The current node and all of its descendants (`**`).
    AnyDepth,
}

impl Segment {
    /// Creates an unqualified named segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, is a wildcard, or carries a
    /// separator or qualifier.
    pub fn named(name: &str) -> Result<Self, Error> {
        match parse_segment(name)? {
            segment @ Self::Named {
                qualifier: None, ..
            } if !name.contains(['.', '/']) => Ok(segment),
            _ => Err(Error::InvalidName(name.trim().to_string())),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Named { name, qualifier } => {
                write!(f, "{name}")?;
                if let Some(qualifier) = qualifier {
                    write!(f, "{qualifier}")?;
                }
                Ok(())
            }
            Self::AnyChild => f.write_str("*"),
            Self::AnyDepth => f.write_str("**"),
        }
    }
}

/// A hierarchical locator for a parameter inside a configuration tree.
///
/// Segments are separated by `.` or `/`, and a leading separator is ignored.
/// Each named segment may carry one bracketed qualifier:
///
/// - `Can.CanController[1].CanControllerBaudRate` selects the second
///   `CanController` under `Can`.
/// - `Can.CanController[CanControllerId=0].CanControllerBaudRate` selects
///   controllers whose `CanControllerId` child is `0`.
///
/// `*` matches any single child and `**` matches any depth, so
/// `**.CanControllerBaudRate` finds the parameter wherever it lives.
///
/// ```
/// use parcheck::ParameterAddress;
///
/// let address: ParameterAddress = "/Can/CanGeneral/CanTimeoutDuration".parse().unwrap();
/// assert_eq!(address.to_string(), "Can.CanGeneral.CanTimeoutDuration");
/// assert_eq!(address.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAddress {
    segments: NonEmpty<Segment>,
}

impl ParameterAddress {
    /// An address matching the named parameter at any depth (`**.<name>`).
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid segment.
    pub fn anywhere(name: &str) -> Result<Self, Error> {
        let segment = Segment::named(name)?;
        Ok(Self {
            segments: NonEmpty {
                head: Segment::AnyDepth,
                tail: vec![segment],
            },
        })
    }

    /// The segments of the address, in traversal order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// The number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; an address has at least one segment.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The final segment, which names the parameter itself.
    #[must_use]
    pub fn last(&self) -> &Segment {
        self.segments.last()
    }
}

impl fmt::Display for ParameterAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ParameterAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix(['.', '/'])
            .unwrap_or(trimmed);
        if body.is_empty() {
            return Err(Error::Empty);
        }

        let segments = split_segments(body)?
            .into_iter()
            .map(parse_segment)
            .collect::<Result<Vec<_>, _>>()?;

        NonEmpty::from_vec(segments)
            .map(|segments| Self { segments })
            .ok_or(Error::Empty)
    }
}

impl TryFrom<&str> for ParameterAddress {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

/// Splits on separators that are outside of brackets.
fn split_segments(body: &str) -> Result<Vec<&str>, Error> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::UnbalancedBracket(body.to_string()))?;
            }
            '.' | '/' if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(Error::UnbalancedBracket(body.to_string()));
    }
    segments.push(&body[start..]);

    if let Some(position) = segments.iter().position(|s| s.trim().is_empty()) {
        return Err(Error::EmptySegment {
            address: body.to_string(),
            position,
        });
    }
    Ok(segments)
}

fn parse_segment(raw: &str) -> Result<Segment, Error> {
    let raw = raw.trim();
    let (name, qualifier) = match raw.split_once('[') {
        None => (raw, None),
        Some((name, rest)) => {
            let inner = rest
                .strip_suffix(']')
                .filter(|inner| !inner.contains(['[', ']']))
                .ok_or_else(|| Error::UnbalancedBracket(raw.to_string()))?;
            (name.trim(), Some(parse_qualifier(raw, inner.trim())?))
        }
    };

    match name {
        "*" | "**" if qualifier.is_some() => Err(Error::QualifiedWildcard(raw.to_string())),
        "*" => Ok(Segment::AnyChild),
        "**" => Ok(Segment::AnyDepth),
        _ if name.contains(['*', ']']) || name.chars().any(char::is_whitespace) => {
            Err(Error::InvalidName(name.to_string()))
        }
        _ => {
            let name = NonEmptyString::new(name.to_string())
                .map_err(|_| Error::InvalidName(raw.to_string()))?;
            Ok(Segment::Named { name, qualifier })
        }
    }
}

fn parse_qualifier(segment: &str, inner: &str) -> Result<Qualifier, Error> {
    if inner.is_empty() {
        return Err(Error::EmptyQualifier(segment.to_string()));
    }

    if inner.chars().all(|c| c.is_ascii_digit()) {
        return inner
            .parse()
            .map(Qualifier::Index)
            .map_err(|_| Error::InvalidQualifier(segment.to_string()));
    }

    let (key, value) = inner
        .split_once('=')
        .ok_or_else(|| Error::InvalidQualifier(segment.to_string()))?;
    let key = NonEmptyString::new(key.trim().to_string())
        .map_err(|_| Error::InvalidQualifier(segment.to_string()))?;

    Ok(Qualifier::Field {
        key,
        value: value.trim().to_string(),
    })
}

/// Errors that can occur while parsing a [`ParameterAddress`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The address contains no segments.
    #[error("parameter address is empty")]
    Empty,

    /// Two separators with nothing between them, or a trailing separator.
    #[error("empty segment at position {position} in '{address}'")]
    EmptySegment {
        /// The offending address.
        address: String,
        /// Zero-based index of the empty segment.
        position: usize,
    },

    /// A `[` without a matching `]`, or vice versa.
    #[error("unbalanced bracket in '{0}'")]
    UnbalancedBracket(String),

    /// `[]` with nothing inside.
    #[error("empty qualifier in '{0}'")]
    EmptyQualifier(String),

    /// A qualifier that is neither an index nor `key=value`.
    #[error("invalid qualifier in '{0}': expected an index or key=value")]
    InvalidQualifier(String),

    /// A qualifier attached to `*` or `**`.
    #[error("wildcards cannot be qualified: '{0}'")]
    QualifiedWildcard(String),

    /// A segment name containing reserved characters.
    #[error("invalid segment name '{0}'")]
    InvalidName(String),
}
