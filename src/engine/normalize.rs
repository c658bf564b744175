//! Coercion of raw values into a comparable representation.
//!
//! Configuration tools and requirement authors rarely agree on how a value is
//! written: `500`, `500.0` and `500 ms` all mean the same timeout, and `yes`,
//! `true`, `1` and `ENABLED` all switch a feature on. [`normalize`] turns both
//! sides into a [`NormalizedValue`] and [`equivalent`] applies the per-type
//! equality rule.

use std::fmt;

use crate::domain::{Config, RawValue, ValueKind};

/// A numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// A decimal or hexadecimal integer; compared exactly.
    Integer(i128),
    /// A floating point value; compared with a relative tolerance.
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    /// `0` and `1` double as boolean flags.
    const fn as_flag(self) -> Option<bool> {
        match self {
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            _ => None,
        }
    }

    #[allow(clippy::float_cmp)]
    fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        if let (Self::Integer(a), Self::Integer(b)) = (self, other) {
            return a == b;
        }
        let (a, b) = (self.as_f64(), other.as_f64());
        a == b || (a - b).abs() <= tolerance * a.abs().max(b.abs())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// A value in a form that can be compared across sources.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    /// A number.
    Number(Number),
    /// A boolean flag.
    Boolean(bool),
    /// Trimmed free text.
    Text(String),
    /// An upper-cased enumeration symbol.
    EnumSymbol(String),
    /// A list of values.
    List(Vec<NormalizedValue>),
}

impl NormalizedValue {
    /// A short name for the variant, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Text(_) => "text",
            Self::EnumSymbol(_) => "enum",
            Self::List(_) => "list",
        }
    }
}

/// A raw value could not be read as the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The text does not parse as the declared kind.
    #[error("'{value}' is not a valid {kind}")]
    Invalid {
        /// The offending text.
        value: String,
        /// The declared kind.
        kind: ValueKind,
    },

    /// A list was found where a single value of the declared kind is needed.
    #[error("a list cannot be read as a single {0}")]
    ListAsScalar(ValueKind),
}

/// Two normalized values have no common type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot compare {actual} with {expected}")]
pub struct TypeMismatch {
    /// Type of the configured value.
    pub actual: &'static str,
    /// Type of the expected value.
    pub expected: &'static str,
}

/// Normalizes a raw value.
///
/// With a declared `kind` the value must be readable as that kind. Without
/// one the kind is inferred: a list stays a list, otherwise a number is tried
/// first, then a boolean word, and anything else is text.
///
/// # Errors
///
/// Returns an error if the value cannot be read as the declared kind.
pub fn normalize(
    raw: &RawValue,
    kind: Option<ValueKind>,
    config: &Config,
) -> Result<NormalizedValue, NormalizeError> {
    match (raw, kind) {
        (RawValue::List(items), None | Some(ValueKind::List)) => items
            .iter()
            .map(|item| normalize_scalar(item, None, config))
            .collect::<Result<_, _>>()
            .map(NormalizedValue::List),
        (RawValue::List(_), Some(kind)) => Err(NormalizeError::ListAsScalar(kind)),
        (RawValue::Scalar(text), kind) => normalize_scalar(text, kind, config),
    }
}

fn normalize_scalar(
    text: &str,
    kind: Option<ValueKind>,
    config: &Config,
) -> Result<NormalizedValue, NormalizeError> {
    let trimmed = text.trim();
    let invalid = |kind| NormalizeError::Invalid {
        value: trimmed.to_string(),
        kind,
    };

    match kind {
        None => Ok(parse_number(trimmed, config.strip_units)
            .map(NormalizedValue::Number)
            .or_else(|| parse_boolean(trimmed, false).map(NormalizedValue::Boolean))
            .unwrap_or_else(|| NormalizedValue::Text(trimmed.to_string()))),
        Some(ValueKind::Number) => parse_number(trimmed, config.strip_units)
            .map(NormalizedValue::Number)
            .ok_or_else(|| invalid(ValueKind::Number)),
        Some(ValueKind::Boolean) => parse_boolean(trimmed, true)
            .map(NormalizedValue::Boolean)
            .ok_or_else(|| invalid(ValueKind::Boolean)),
        Some(ValueKind::Text) => Ok(NormalizedValue::Text(trimmed.to_string())),
        Some(ValueKind::Enum) if trimmed.is_empty() => Err(invalid(ValueKind::Enum)),
        Some(ValueKind::Enum) => Ok(NormalizedValue::EnumSymbol(trimmed.to_uppercase())),
        Some(ValueKind::List) => split_list(trimmed)
            .map(|item| normalize_scalar(item, None, config))
            .collect::<Result<_, _>>()
            .map(NormalizedValue::List),
    }
}

/// Splits `a, b, c` (optionally wrapped in brackets) into items.
fn split_list(text: &str) -> impl Iterator<Item = &str> {
    let inner = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(text);
    inner.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_number(text: &str, strip_units: bool) -> Option<Number> {
    parse_plain_number(text).or_else(|| {
        strip_units
            .then(|| leading_quantity(text))
            .flatten()
            .and_then(parse_plain_number)
    })
}

/// The number in `"<number> <unit>"`, if the rest looks like a unit.
fn leading_quantity(text: &str) -> Option<&str> {
    let (number, unit) = text.split_once(char::is_whitespace)?;
    let unit = unit.trim();
    let looks_like_unit = unit
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '%')
        && !unit.contains(char::is_whitespace);
    looks_like_unit.then_some(number)
}

fn parse_plain_number(text: &str) -> Option<Number> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = i128::from_str_radix(hex, 16).ok()?;
        return Some(Number::Integer(if negative { -value } else { value }));
    }

    let has_digit = unsigned.chars().any(|c| c.is_ascii_digit());
    if !has_digit {
        return None;
    }

    if unsigned.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(value) = text.parse::<i128>() {
            return Some(Number::Integer(value));
        }
    }

    let float_like = unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    float_like
        .then(|| text.parse::<f64>().ok())
        .flatten()
        .filter(|value| value.is_finite())
        .map(Number::Float)
}

fn parse_boolean(text: &str, accept_digits: bool) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "enabled" | "on" => Some(true),
        "false" | "no" | "disabled" | "off" => Some(false),
        "1" if accept_digits => Some(true),
        "0" if accept_digits => Some(false),
        _ => None,
    }
}

/// Decides whether a configured value is equivalent to an expected value.
///
/// - numbers: integers exactly, anything involving a float within
///   [`Config::float_tolerance`] (relative)
/// - booleans: equal flags; the integers `0` and `1` count as flags
/// - text: equal after trimming, case-insensitive if configured
/// - enum symbols: equal ignoring case
/// - lists: same length and pairwise equivalent, as a sequence when `ordered`
///   and as a multiset otherwise
///
/// # Errors
///
/// Returns [`TypeMismatch`] when the two values have no common type.
pub fn equivalent(
    actual: &NormalizedValue,
    expected: &NormalizedValue,
    ordered: bool,
    config: &Config,
) -> Result<bool, TypeMismatch> {
    use NormalizedValue as V;

    let mismatch = || TypeMismatch {
        actual: actual.type_name(),
        expected: expected.type_name(),
    };

    match (actual, expected) {
        (V::Number(a), V::Number(b)) => Ok(a.approx_eq(*b, config.float_tolerance)),
        (V::Boolean(a), V::Boolean(b)) => Ok(a == b),
        (V::Boolean(flag), V::Number(number)) | (V::Number(number), V::Boolean(flag)) => number
            .as_flag()
            .map(|value| value == *flag)
            .ok_or_else(mismatch),
        (V::Text(a), V::Text(b)) if config.case_insensitive_text => {
            Ok(a.to_lowercase() == b.to_lowercase())
        }
        (V::Text(a), V::Text(b)) | (V::EnumSymbol(a), V::EnumSymbol(b)) => Ok(a == b),
        (V::List(a), V::List(b)) => Ok(lists_equivalent(a, b, ordered, config)),
        _ => Err(mismatch()),
    }
}

fn lists_equivalent(
    actual: &[NormalizedValue],
    expected: &[NormalizedValue],
    ordered: bool,
    config: &Config,
) -> bool {
    if actual.len() != expected.len() {
        return false;
    }

    let same = |a: &NormalizedValue, e: &NormalizedValue| {
        matches!(equivalent(a, e, ordered, config), Ok(true))
    };

    if ordered {
        return actual.iter().zip(expected).all(|(a, e)| same(a, e));
    }

    let mut used = vec![false; actual.len()];
    for e in expected {
        let Some(slot) = (0..actual.len()).find(|&i| !used[i] && same(&actual[i], e)) else {
            return false;
        };
        used[slot] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn auto(text: &str) -> NormalizedValue {
        normalize(&RawValue::scalar(text), None, &Config::default()).unwrap()
    }

    fn same(actual: &str, expected: &str) -> Result<bool, TypeMismatch> {
        equivalent(&auto(actual), &auto(expected), false, &Config::default())
    }

    #[test_case("500", NormalizedValue::Number(Number::Integer(500)); "integer")]
    #[test_case(" -42 ", NormalizedValue::Number(Number::Integer(-42)); "negative integer")]
    #[test_case("0x1F", NormalizedValue::Number(Number::Integer(31)); "hexadecimal")]
    #[test_case("500.0", NormalizedValue::Number(Number::Float(500.0)); "float")]
    #[test_case("1e3", NormalizedValue::Number(Number::Float(1000.0)); "exponent")]
    #[test_case("500 kbps", NormalizedValue::Number(Number::Integer(500)); "unit stripped")]
    #[test_case("Yes", NormalizedValue::Boolean(true); "boolean word")]
    #[test_case("DISABLED", NormalizedValue::Boolean(false); "uppercase boolean word")]
    #[test_case("1", NormalizedValue::Number(Number::Integer(1)); "digit stays numeric")]
    #[test_case("  STD_ON ", NormalizedValue::Text("STD_ON".to_string()); "trimmed text")]
    #[test_case("inf", NormalizedValue::Text("inf".to_string()); "infinity is text")]
    #[test_case("1.2.3", NormalizedValue::Text("1.2.3".to_string()); "version is text")]
    #[test_case("1 2", NormalizedValue::Text("1 2".to_string()); "two numbers are text")]
    fn infers_kind(text: &str, expected: NormalizedValue) {
        assert_eq!(auto(text), expected);
    }

    #[test]
    fn units_are_kept_when_stripping_is_disabled() {
        let config = Config {
            strip_units: false,
            ..Config::default()
        };
        let value = normalize(&RawValue::scalar("500 kbps"), None, &config).unwrap();
        assert_eq!(value, NormalizedValue::Text("500 kbps".to_string()));
    }

    #[test_case("1", ValueKind::Boolean, NormalizedValue::Boolean(true); "digit as boolean")]
    #[test_case("off", ValueKind::Boolean, NormalizedValue::Boolean(false); "word as boolean")]
    #[test_case("42", ValueKind::Text, NormalizedValue::Text("42".to_string()); "number as text")]
    #[test_case("can_baud_500", ValueKind::Enum, NormalizedValue::EnumSymbol("CAN_BAUD_500".to_string()); "enum upper cased")]
    #[test_case("[1, two]", ValueKind::List, NormalizedValue::List(vec![
        NormalizedValue::Number(Number::Integer(1)),
        NormalizedValue::Text("two".to_string()),
    ]); "list from text")]
    fn honours_declared_kind(text: &str, kind: ValueKind, expected: NormalizedValue) {
        let value = normalize(&RawValue::scalar(text), Some(kind), &Config::default()).unwrap();
        assert_eq!(value, expected);
    }

    #[test_case("abc", ValueKind::Number; "text as number")]
    #[test_case("maybe", ValueKind::Boolean; "text as boolean")]
    #[test_case("2", ValueKind::Boolean; "two as boolean")]
    #[test_case(" ", ValueKind::Enum; "blank enum")]
    fn rejects_values_of_the_wrong_kind(text: &str, kind: ValueKind) {
        let error = normalize(&RawValue::scalar(text), Some(kind), &Config::default()).unwrap_err();
        assert!(matches!(error, NormalizeError::Invalid { kind: k, .. } if k == kind));
    }

    #[test]
    fn list_cannot_be_read_as_scalar_kind() {
        let error = normalize(&RawValue::list(["1"]), Some(ValueKind::Number), &Config::default())
            .unwrap_err();
        assert_eq!(error, NormalizeError::ListAsScalar(ValueKind::Number));
    }

    #[test_case("true", "yes", true; "true is yes")]
    #[test_case("1", "yes", true; "one is yes")]
    #[test_case("enabled", "no", false; "enabled is not no")]
    #[test_case("0", "false", true; "zero is false")]
    #[test_case("ON", "enabled", true; "on is enabled")]
    fn boolean_equivalence(actual: &str, expected: &str, equal: bool) {
        assert_eq!(same(actual, expected), Ok(equal));
    }

    #[test_case("500.0", "500", true; "float equals integer")]
    #[test_case("0x10", "16", true; "hex equals decimal")]
    #[test_case("500 ms", "500", true; "unit ignored")]
    #[test_case("0.30000000000000004", "0.3", true; "within tolerance")]
    #[test_case("1.001", "1", false; "outside tolerance")]
    #[test_case("501", "500", false; "different integers")]
    fn numeric_equivalence(actual: &str, expected: &str, equal: bool) {
        assert_eq!(same(actual, expected), Ok(equal));
    }

    #[test]
    fn integers_ignore_tolerance() {
        let config = Config {
            float_tolerance: 0.5,
            ..Config::default()
        };
        let result = equivalent(&auto("100"), &auto("101"), false, &config);
        assert_eq!(result, Ok(false));

        let result = equivalent(&auto("100.0"), &auto("101"), false, &config);
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn text_is_case_sensitive_by_default() {
        assert_eq!(same("STD_ON", "std_on"), Ok(false));

        let config = Config {
            case_insensitive_text: true,
            ..Config::default()
        };
        let result = equivalent(&auto("STD_ON"), &auto("std_on"), false, &config);
        assert_eq!(result, Ok(true));
    }

    #[test_case("five hundred", "500"; "text versus number")]
    #[test_case("2", "yes"; "non flag number versus boolean")]
    #[test_case("maybe", "no"; "text versus boolean")]
    fn incompatible_types(actual: &str, expected: &str) {
        assert!(same(actual, expected).is_err());
    }

    #[test]
    fn lists_compare_as_multisets_unless_ordered() {
        let config = Config::default();
        let actual = normalize(&RawValue::list(["3", "1", "2", "1"]), None, &config).unwrap();
        let expected = normalize(&RawValue::list(["1", "1", "2", "3.0"]), None, &config).unwrap();

        assert_eq!(equivalent(&actual, &expected, false, &config), Ok(true));
        assert_eq!(equivalent(&actual, &expected, true, &config), Ok(false));
    }

    #[test]
    fn multiset_respects_multiplicity() {
        let config = Config::default();
        let actual = normalize(&RawValue::list(["1", "1", "2"]), None, &config).unwrap();
        let expected = normalize(&RawValue::list(["1", "2", "2"]), None, &config).unwrap();
        assert_eq!(equivalent(&actual, &expected, false, &config), Ok(false));
    }

    #[test]
    fn list_versus_scalar_is_incompatible() {
        let config = Config::default();
        let list = normalize(&RawValue::list(["1"]), None, &config).unwrap();
        let error = equivalent(&list, &auto("1"), false, &config).unwrap_err();
        assert_eq!(
            error,
            TypeMismatch {
                actual: "list",
                expected: "number"
            }
        );
    }
}
