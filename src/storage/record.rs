//! The requirements record: a versioned list of requirements stored as YAML,
//! JSON or TOML.
//!
//! The record is read into [`Requirement`]s and, after a run, written back
//! with each entry annotated with its status, verdict, actual value and note.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    fs, io,
    path::Path,
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        ParameterAddress, RawValue, Requirement, SelectionRule, Status, UnresolvedError,
        ValueKind, Verdict,
    },
    engine::{ReportResult, ReportRow},
};

/// `<parameter> shall be set to <value>`, with any trailing punctuation
/// dropped from the value.
static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(.*?\S)\s+shall\s+be\s+set\s+to\s+(.*\w)")
        .expect("statement pattern is a valid regex")
});

/// Errors that can occur when loading a requirements record.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The record file was not found.
    #[error("requirements record not found")]
    NotFound,
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The file extension is not one of the supported formats.
    #[error("unsupported requirements record format '{0}' (expected yaml, yml, json or toml)")]
    UnsupportedFormat(String),
    /// The YAML content could not be parsed.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The JSON content could not be parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The TOML content could not be parsed.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();
        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(LoadError::UnsupportedFormat(extension.to_string())),
        }
    }

    fn parse(self, content: &str) -> Result<RequirementRecord, LoadError> {
        Ok(match self {
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
        })
    }

    fn render(self, record: &RequirementRecord) -> io::Result<String> {
        match self {
            Self::Yaml => serde_yaml::to_string(record).map_err(io::Error::other),
            Self::Json => serde_json::to_string_pretty(record).map_err(io::Error::other),
            Self::Toml => toml::to_string_pretty(record).map_err(io::Error::other),
        }
    }
}

/// A requirements record, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct RequirementRecord {
    entries: Vec<RecordEntry>,
}

impl RequirementRecord {
    /// Reads a record, choosing the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not supported, the file cannot
    /// be read, or its content is not a valid record.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let format = Format::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;
        format.parse(&content)
    }

    /// Writes the record in the format implied by the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not supported or the file cannot
    /// be written.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let format = Format::from_path(path).map_err(io::Error::other)?;
        fs::write(path, format.render(self)?)
    }

    /// The number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts every entry into an unresolved [`Requirement`].
    ///
    /// Entries are never dropped: a statement that cannot be understood is
    /// carried as a defect and reported unresolved, and repeated identifiers
    /// are passed through (with a warning) for the engine to reject.
    #[must_use]
    pub fn requirements(&self) -> Vec<Requirement> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries
            .iter()
            .inspect(|entry| {
                if !seen.insert(entry.id.as_str()) {
                    tracing::warn!("Duplicate requirement id '{}'", entry.id);
                }
            })
            .map(RecordEntry::to_requirement)
            .collect()
    }

    /// Copies the outcome of a run onto the matching entries.
    ///
    /// Rows are matched to entries by identifier; entries sharing an
    /// identifier take the rows in record order.
    pub fn annotate(&mut self, result: &ReportResult) {
        let mut rows: HashMap<&str, VecDeque<&ReportRow>> = HashMap::new();
        for row in &result.rows {
            rows.entry(row.id.as_str()).or_default().push_back(row);
        }

        for entry in &mut self.entries {
            let Some(row) = rows.get_mut(entry.id.as_str()).and_then(VecDeque::pop_front) else {
                continue;
            };
            entry.status = Some(row.status);
            entry.verdict = row.verdict;
            entry.actual.clone_from(&row.actual);
            entry.note = Some(row.note.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RecordEntry {
    id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    statement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected: Option<RecordValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<ValueKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    selection: Option<SelectionRule>,

    #[serde(default, skip_serializing_if = "is_false")]
    expect_absent: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    ordered: bool,

    // Written after a run, ignored on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<Status>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    actual: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl RecordEntry {
    fn to_requirement(&self) -> Requirement {
        let mut requirement = match (&self.path, &self.statement) {
            (None, Some(statement)) => match parse_statement(statement) {
                Ok((path, expected)) => Requirement::new(self.id.clone(), path, Some(expected)),
                Err(defect) => Requirement::new(self.id.clone(), "", None).with_defect(defect),
            },
            (path, _) => Requirement::new(
                self.id.clone(),
                path.clone().unwrap_or_default(),
                self.expected.as_ref().map(RawValue::from),
            ),
        };

        requirement.description.clone_from(&self.description);
        requirement.kind = self.kind;
        requirement.selection = self.selection;
        requirement.expect_absent = self.expect_absent;
        requirement.ordered = self.ordered;
        requirement
    }
}

/// Extracts the parameter address and expected value from a statement such
/// as `The CanControllerBaudRate shall be set to 500 kbps.`
///
/// The last word before `shall` names the parameter. A bare name may live
/// anywhere in the configuration; a dotted or slashed one is used as is.
fn parse_statement(statement: &str) -> Result<(String, RawValue), UnresolvedError> {
    let captures = STATEMENT
        .captures(statement)
        .ok_or_else(|| UnresolvedError::Statement(statement.to_string()))?;

    let name = captures[1].split_whitespace().last().unwrap_or_default();
    let path = if name.contains(['.', '/']) {
        name.to_string()
    } else {
        ParameterAddress::anywhere(name)?.to_string()
    };

    Ok((path, RawValue::scalar(captures[2].trim())))
}

/// A scalar in a record, keeping the type the document gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RecordScalar {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl From<&RecordScalar> for String {
    fn from(scalar: &RecordScalar) -> Self {
        match scalar {
            RecordScalar::Bool(value) => value.to_string(),
            RecordScalar::Integer(value) => value.to_string(),
            RecordScalar::Unsigned(value) => value.to_string(),
            RecordScalar::Float(value) => value.to_string(),
            RecordScalar::Text(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum RecordValue {
    List(Vec<RecordScalar>),
    Scalar(RecordScalar),
}

impl From<&RecordValue> for RawValue {
    fn from(value: &RecordValue) -> Self {
        match value {
            RecordValue::Scalar(scalar) => Self::Scalar(scalar.into()),
            RecordValue::List(items) => Self::list(items),
        }
    }
}

/// The serialized versions of the record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        requirements: Vec<RecordEntry>,
    },
}

impl From<Versions> for RequirementRecord {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 { requirements } => Self {
                entries: requirements,
            },
        }
    }
}

impl From<RequirementRecord> for Versions {
    fn from(record: RequirementRecord) -> Self {
        Self::V1 {
            requirements: record.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_case::test_case;

    use super::*;
    use crate::domain::{Config, ConfigTree};

    const YAML: &str = r#"_version: "1"
requirements:
  - id: R1
    description: CAN timeout
    path: ModuleA.Timeout
    expected: 500
  - id: R2
    statement: The CanControllerBaudRate shall be set to 500 kbps.
  - id: R3
    path: ModuleA.Channels
    expected: [a, b]
    kind: list
    ordered: true
  - id: R4
    path: ModuleA.Debug
    expect_absent: true
  - id: R5
    statement: nothing useful here
"#;

    fn write_record(extension: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{extension}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test_case("yaml", "_version: \"1\"\nrequirements:\n  - id: R1\n    path: Can.Mask\n    expected: 18446744073709551615\n"; "yaml")]
    #[test_case("json", r#"{"_version": "1", "requirements": [{"id": "R1", "path": "Can.Mask", "expected": 18446744073709551615}]}"#; "json")]
    fn large_unsigned_integers_are_kept_exactly(extension: &str, content: &str) {
        let file = write_record(extension, content);
        let record = RequirementRecord::load(file.path()).unwrap();
        let requirements = record.requirements();
        assert_eq!(
            requirements[0].expected(),
            Some(&RawValue::scalar("18446744073709551615"))
        );

        let mut builder = ConfigTree::builder("EcuC.yaml");
        let root = builder.root();
        let can = builder.add_child(root, "Can", None);
        builder.add_child(can, "Mask", Some(RawValue::scalar("18446744073709551615")));
        let result = crate::engine::run(requirements, &[builder.build()], &Config::default());
        assert_eq!(result.rows[0].verdict, Some(crate::domain::Verdict::Matched));

        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join(format!("saved.{extension}"));
        record.save(&saved).unwrap();
        let reloaded = RequirementRecord::load(&saved).unwrap().requirements();
        assert_eq!(
            reloaded[0].expected(),
            Some(&RawValue::scalar("18446744073709551615"))
        );
    }

    #[test]
    fn loads_yaml_record() {
        let file = write_record("yaml", YAML);
        let requirements = RequirementRecord::load(file.path()).unwrap().requirements();

        assert_eq!(requirements.len(), 5);

        let r1 = &requirements[0];
        assert_eq!(r1.id(), "R1");
        assert_eq!(r1.description(), "CAN timeout");
        assert_eq!(r1.path(), "ModuleA.Timeout");
        assert_eq!(r1.expected(), Some(&RawValue::scalar("500")));

        let r2 = &requirements[1];
        assert_eq!(r2.path(), "**.CanControllerBaudRate");
        assert_eq!(r2.expected(), Some(&RawValue::scalar("500 kbps")));

        let r3 = &requirements[2];
        assert_eq!(r3.expected(), Some(&RawValue::list(["a", "b"])));
        assert_eq!(r3.kind(), Some(ValueKind::List));
        assert!(r3.is_ordered());

        assert!(requirements[3].is_absence_flagged());
        assert!(matches!(
            requirements[4].defect(),
            Some(UnresolvedError::Statement(_))
        ));
    }

    #[test]
    fn loads_json_and_toml_records() {
        let json = write_record(
            "json",
            r#"{"_version": "1", "requirements": [{"id": "R1", "path": "A.B", "expected": true}]}"#,
        );
        let toml = write_record(
            "toml",
            "_version = \"1\"\n\n[[requirements]]\nid = \"R1\"\npath = \"A.B\"\nexpected = 0.5\n",
        );

        let from_json = RequirementRecord::load(json.path()).unwrap().requirements();
        assert_eq!(from_json[0].expected(), Some(&RawValue::scalar("true")));

        let from_toml = RequirementRecord::load(toml.path()).unwrap().requirements();
        assert_eq!(from_toml[0].expected(), Some(&RawValue::scalar("0.5")));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = write_record("xlsx", YAML);
        assert!(matches!(
            RequirementRecord::load(file.path()),
            Err(LoadError::UnsupportedFormat(extension)) if extension == "xlsx"
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            RequirementRecord::load(&tmp.path().join("missing.yaml")),
            Err(LoadError::NotFound)
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let file = write_record("yaml", "_version: \"2\"\nrequirements: []\n");
        assert!(matches!(
            RequirementRecord::load(file.path()),
            Err(LoadError::Yaml(_))
        ));
    }

    #[test_case("CanTimeout shall be set to 10", "**.CanTimeout", "10"; "bare name")]
    #[test_case("Can.General.Timeout SHALL BE SET TO 10ms.", "Can.General.Timeout", "10ms"; "dotted path")]
    #[test_case("The parameter EnableDev shall be set to STD_ON", "**.EnableDev", "STD_ON"; "leading prose")]
    fn statements_yield_address_and_value(statement: &str, path: &str, expected: &str) {
        let (actual_path, actual_expected) = parse_statement(statement).unwrap();
        assert_eq!(actual_path, path);
        assert_eq!(actual_expected, RawValue::scalar(expected));
    }

    #[test]
    fn duplicates_are_passed_through() {
        let file = write_record(
            "yaml",
            "_version: \"1\"\nrequirements:\n  - {id: R1, path: A.B, expected: 1}\n  - {id: R1, path: A.B, expected: 2}\n",
        );
        let requirements = RequirementRecord::load(file.path()).unwrap().requirements();
        assert_eq!(requirements.len(), 2);
    }

    #[test]
    fn annotated_record_round_trips_outputs() {
        let mut builder = ConfigTree::builder("EcuC.yaml");
        let root = builder.root();
        let module = builder.add_child(root, "ModuleA", None);
        builder.add_child(module, "Timeout", Some(RawValue::scalar("500.0")));
        let trees = vec![builder.build()];

        let tmp = tempfile::tempdir().unwrap();
        let source = write_record("yaml", YAML);
        let mut record = RequirementRecord::load(source.path()).unwrap();
        let result = crate::engine::run(record.requirements(), &trees, &Config::default());
        record.annotate(&result);

        let saved = tmp.path().join("requirements.yaml");
        record.save(&saved).unwrap();
        let reloaded = RequirementRecord::load(&saved).unwrap();
        assert_eq!(reloaded, record);

        let r1 = &reloaded.entries[0];
        assert_eq!(r1.status, Some(Status::Pass));
        assert_eq!(r1.verdict, Some(Verdict::Matched));
        assert_eq!(r1.actual.as_deref(), Some("500.0"));

        let r5 = &reloaded.entries[4];
        assert_eq!(r5.status, Some(Status::Unresolved));
        assert_eq!(r5.verdict, None);

        // Output fields do not feed back into evaluation.
        assert_eq!(reloaded.requirements(), record.requirements());
    }

    #[test]
    fn annotated_record_saves_as_toml() {
        let source = write_record("yaml", YAML);
        let mut record = RequirementRecord::load(source.path()).unwrap();
        let result = crate::engine::run(record.requirements(), &[], &Config::default());
        record.annotate(&result);

        let tmp = tempfile::tempdir().unwrap();
        let saved = tmp.path().join("requirements.toml");
        record.save(&saved).unwrap();
        assert_eq!(RequirementRecord::load(&saved).unwrap(), record);
    }
}
